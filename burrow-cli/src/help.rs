use crate::args::Command;
use std::env::current_exe;

fn get_program_name() -> String {
    current_exe()
        .ok()
        .and_then(|path_buf| {
            let path = path_buf.as_path();
            if path.is_file() {
                path.file_name().and_then(|name| name.to_str().map(ToString::to_string))
            } else {
                None
            }
        })
        .unwrap_or_else(|| "burrow-cli".to_string())
}

pub fn show_help(error: Option<String>) {
    println!("Burrow command line client");
    println!();
    println!("USAGE:");
    println!("    {} [OPTIONS] [SUBCOMMAND]", get_program_name());
    println!();
    println!("OPTIONS:");
    println!("    --host <HOST>            Specify the server host (default: localhost)");
    println!("    --port <PORT>            Specify the server port (default: 8080)");
    println!("    --help                   Prints help information");
    println!();
    println!("SUBCOMMANDS:");
    println!("    account list             List accounts");
    println!("    account delete           Delete accounts");
    println!("    queue list               List the queues of an account");
    println!("    queue delete             Delete queues of an account");
    println!("    message list             List messages in a queue");
    println!("    message delete           Delete a message, or a range of messages");
    println!("    message update           Update a message's ttl/hide, or a range of messages");
    println!("    message get              Get a single message");
    println!("    message create           Create or replace a single message");
    println!();
    println!(
        "See '{} command help' for more information on a specific command.",
        get_program_name()
    );

    if let Some(error) = error {
        println!();
        println!("{}", error);
    }
}

pub fn show_subcommand_help(error: Option<String>, cmd: &Command) {
    let (flags, subcommand, subcommand_description) = subcommand_help(cmd);

    let mut flags_string = String::new();
    let mut max_flag_length = 0;
    for (flag, _, required) in &flags {
        if !flags_string.is_empty() {
            flags_string.push(' ');
        }
        if !*required {
            flags_string.push('[');
        }
        flags_string.push_str(flag);
        if !*required {
            flags_string.push(']');
        }

        max_flag_length = max_flag_length.max(flag.len());
    }

    println!("Burrow command line client");
    println!();
    println!("USAGE:");
    println!("    {} [OPTIONS] {} {}", get_program_name(), subcommand, flags_string);
    println!();
    println!("OPTIONS:");
    for (flag, description, _) in flags {
        let ws_len = 4 + max_flag_length - flag.len();
        let mut ws = String::with_capacity(ws_len);
        while ws.len() < ws.capacity() {
            ws.push(' ');
        }
        println!("    {}{}{}", flag, ws, description);
    }
    println!();
    println!("{}", subcommand_description);

    if let Some(error) = error {
        println!();
        println!("{}", error);
    }
}

const DETAIL_HELP: &str = "What to return: none, id, attributes, body, or all (default varies by command)";
const ENTITY_DETAIL_HELP: &str = "What to return: none, id, or all (default varies by command)";

fn subcommand_help(cmd: &Command) -> (Vec<(&'static str, &'static str, bool)>, &'static str, &'static str) {
    match cmd {
        Command::GetAccounts(_, _) => {
            #[rustfmt::skip]
            let flags = vec![
                ("--marker <ID>", "Only match accounts ordered after this id", false),
                ("--limit <NUMBER>", "The maximum number of accounts to return", false),
                ("--detail <DETAIL>", ENTITY_DETAIL_HELP, false),
            ];

            (flags, "account list", "List accounts known to the server.")
        },
        Command::DeleteAccounts(_, _) => {
            #[rustfmt::skip]
            let flags = vec![
                ("--marker <ID>", "Only match accounts ordered after this id", false),
                ("--limit <NUMBER>", "The maximum number of accounts to delete", false),
                ("--detail <DETAIL>", ENTITY_DETAIL_HELP, false),
            ];

            (flags, "account delete", "Delete accounts, and all their queues and messages. With no filters, wipes every account.")
        },
        Command::GetQueues(_, _, _) => {
            #[rustfmt::skip]
            let flags = vec![
                ("--account <ACCOUNT>", "The account to list queues of", true),
                ("--marker <ID>", "Only match queues ordered after this id", false),
                ("--limit <NUMBER>", "The maximum number of queues to return", false),
                ("--detail <DETAIL>", ENTITY_DETAIL_HELP, false),
            ];

            (flags, "queue list", "List the queues of an account.")
        },
        Command::DeleteQueues(_, _, _) => {
            #[rustfmt::skip]
            let flags = vec![
                ("--account <ACCOUNT>", "The account to delete queues of", true),
                ("--marker <ID>", "Only match queues ordered after this id", false),
                ("--limit <NUMBER>", "The maximum number of queues to delete", false),
                ("--detail <DETAIL>", ENTITY_DETAIL_HELP, false),
            ];

            (flags, "queue delete", "Delete queues, and all their messages. With no filters, wipes every queue of the account.")
        },
        Command::GetMessages(_, _, _, _) => {
            #[rustfmt::skip]
            let flags = vec![
                ("--account <ACCOUNT>", "The account the queue belongs to", true),
                ("--queue <QUEUE>", "The queue to list messages from", true),
                ("--marker <ID>", "Only match messages ordered after this id", false),
                ("--limit <NUMBER>", "The maximum number of messages to return", false),
                ("--all", "Also match hidden messages", false),
                ("--wait <SECONDS>", "Seconds to wait for a match before giving up", false),
                ("--detail <DETAIL>", DETAIL_HELP, false),
            ];

            (flags, "message list", "List messages in a queue.")
        },
        Command::DeleteMessages(_, _, _, _) | Command::DeleteMessage(_, _, _, _) => {
            #[rustfmt::skip]
            let flags = vec![
                ("--account <ACCOUNT>", "The account the queue belongs to", true),
                ("--queue <QUEUE>", "The queue to delete messages from", true),
                ("--message-id <ID>", "Delete a single message by id instead of a range", false),
                ("--marker <ID>", "Only match messages ordered after this id (ignored with --message-id)", false),
                ("--limit <NUMBER>", "The maximum number of messages to delete (ignored with --message-id)", false),
                ("--all", "Also match hidden messages (ignored with --message-id)", false),
                ("--wait <SECONDS>", "Seconds to wait for a match before giving up (ignored with --message-id)", false),
                ("--detail <DETAIL>", DETAIL_HELP, false),
            ];

            (flags, "message delete", "Delete a single message (with --message-id) or a range of messages.")
        },
        Command::UpdateMessages(_, _, _, _, _) | Command::UpdateMessage(_, _, _, _, _) => {
            #[rustfmt::skip]
            let flags = vec![
                ("--account <ACCOUNT>", "The account the queue belongs to", true),
                ("--queue <QUEUE>", "The queue to update messages in", true),
                ("--message-id <ID>", "Update a single message by id instead of a range", false),
                ("--ttl <SECONDS>", "New time-to-live, relative to now", false),
                ("--hide <SECONDS>", "New hide window, relative to now", false),
                ("--marker <ID>", "Only match messages ordered after this id (ignored with --message-id)", false),
                ("--limit <NUMBER>", "The maximum number of messages to update (ignored with --message-id)", false),
                ("--all", "Also match hidden messages (ignored with --message-id)", false),
                ("--wait <SECONDS>", "Seconds to wait for a match before giving up (ignored with --message-id)", false),
                ("--detail <DETAIL>", DETAIL_HELP, false),
            ];

            (flags, "message update", "Update ttl/hide on a single message (with --message-id) or a range of messages.")
        },
        Command::GetMessage(_, _, _, _) => {
            #[rustfmt::skip]
            let flags = vec![
                ("--account <ACCOUNT>", "The account the queue belongs to", true),
                ("--queue <QUEUE>", "The queue the message is in", true),
                ("--message-id <ID>", "The id of the message to get", true),
                ("--detail <DETAIL>", DETAIL_HELP, false),
            ];

            (flags, "message get", "Get a single message by id.")
        },
        Command::CreateMessage(_, _, _, _, _) => {
            #[rustfmt::skip]
            let flags = vec![
                ("--account <ACCOUNT>", "The account the queue belongs to", true),
                ("--queue <QUEUE>", "The queue to create the message in", true),
                ("--message-id <ID>", "The id of the message to create or replace", true),
                ("--ttl <SECONDS>", "Time-to-live, relative to now (default: the server's configured default)", false),
                ("--hide <SECONDS>", "Hide window, relative to now (default: the server's configured default)", false),
            ];

            (flags, "message create", "Create or replace a message. The message body is read from standard input.")
        },
    }
}
