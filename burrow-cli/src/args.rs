use burrow_common::{Attrs, EngineError, EntityDetail, Filter, MessageDetail};
use std::{
    env::args,
    io::{stdin, Read},
    str::FromStr,
};

pub enum ParsedArgs {
    ShowHelp(Option<String>),
    ShowCommandHelp(Option<String>, Command),
    RunCommand(String, u16, Command),
}

#[derive(Clone)]
pub enum Command {
    GetAccounts(Filter, EntityDetail),
    DeleteAccounts(Filter, EntityDetail),
    GetQueues(String, Filter, EntityDetail),
    DeleteQueues(String, Filter, EntityDetail),
    GetMessages(String, String, Filter, MessageDetail),
    DeleteMessages(String, String, Filter, MessageDetail),
    UpdateMessages(String, String, Filter, Attrs, MessageDetail),
    GetMessage(String, String, String, MessageDetail),
    DeleteMessage(String, String, String, MessageDetail),
    UpdateMessage(String, String, String, Attrs, MessageDetail),
    CreateMessage(String, String, String, Vec<u8>, Attrs),
}

#[must_use]
pub fn parse_os_args() -> ParsedArgs {
    let mut arg_vec = Vec::new();
    let mut has_first = false;

    for arg in args() {
        if has_first {
            arg_vec.push(arg);
        } else {
            has_first = true;
        }
    }

    parse_args(arg_vec)
}

fn parse_args(args: Vec<String>) -> ParsedArgs {
    match parse_top_options(args) {
        Err(msg) => ParsedArgs::ShowHelp(msg),
        Ok((arg_vec, host, port)) => match parse_cmd(arg_vec) {
            Err(result) => result,
            Ok(cmd) => ParsedArgs::RunCommand(host, port, cmd),
        },
    }
}

fn parse_top_options(mut args: Vec<String>) -> Result<(Vec<String>, String, u16), Option<String>> {
    let mut host = "localhost".to_string();
    let mut port = 8080;
    args.reverse();

    loop {
        match args.last() {
            None => break,
            Some(s) => {
                let s: &str = s;
                match s {
                    "--host" => {
                        args.pop();
                        if let Some(new_host) = args.pop() {
                            host = new_host;
                        } else {
                            return Err(Some("Missing argument to --host".to_string()));
                        }
                    },
                    "--port" => {
                        args.pop();
                        if let Some(new_port) = args.pop() {
                            match new_port.parse() {
                                Err(err) => {
                                    return Err(Some(format!("Failed to parse {} as port: {}", new_port, err)));
                                },
                                Ok(new_port) => {
                                    port = new_port;
                                },
                            };
                        } else {
                            return Err(Some("Missing argument to --port".to_string()));
                        }
                    },
                    "--help" => return Err(None),
                    _ => {
                        if s.starts_with('-') {
                            return Err(Some(format!("Unrecognized option {}", s)));
                        }

                        break;
                    },
                }
            },
        };
    }

    Ok((args, host, port))
}

fn parse_cmd(mut args: Vec<String>) -> Result<Command, ParsedArgs> {
    match args.pop() {
        None => Err(ParsedArgs::ShowHelp(None)),
        Some(cmd) => {
            let s: &str = &cmd;
            match s {
                "account" => parse_account_cmd(args),
                "queue" => parse_queue_cmd(args),
                "message" => parse_message_cmd(args),
                "help" => Err(ParsedArgs::ShowHelp(None)),
                _ => Err(ParsedArgs::ShowHelp(Some(format!("Unrecognized command {}", cmd)))),
            }
        },
    }
}

/// Everything that can appear after a subcommand, accumulated before being
/// validated and sorted into a `Filter`/`Attrs`/detail by the caller.
#[derive(Default)]
struct RawArgs {
    account:      Option<String>,
    queue:        Option<String>,
    message_id:   Option<String>,
    ttl:          Option<i64>,
    hide:         Option<i64>,
    limit:        Option<u64>,
    marker:       Option<String>,
    match_hidden: bool,
    wait:         Option<u64>,
    detail:       Option<String>,
}

fn parse_single_arg_string(args: &mut Vec<String>, cmd: &Command, error_msg: &'static str) -> Result<String, ParsedArgs> {
    args.pop().map_or_else(
        || Err(ParsedArgs::ShowCommandHelp(Some(error_msg.to_string()), cmd.clone())),
        Ok,
    )
}

fn parse_single_arg<T: FromStr, F: FnOnce(&str, <T as FromStr>::Err) -> String>(
    args: &mut Vec<String>,
    cmd: &Command,
    missing_error_msg: &'static str,
    mk_parse_error: F,
) -> Result<T, ParsedArgs> {
    let val = parse_single_arg_string(args, cmd, missing_error_msg)?;
    val.parse()
        .map_err(|err| ParsedArgs::ShowCommandHelp(Some(mk_parse_error(&val, err)), cmd.clone()))
}

fn parse_flags(mut args: Vec<String>, cmd: &Command) -> Result<RawArgs, ParsedArgs> {
    let mut raw = RawArgs::default();

    while let Some(arg) = args.pop() {
        let s: &str = &arg;
        match s {
            "--account" => {
                raw.account = Some(parse_single_arg_string(
                    &mut args,
                    cmd,
                    "Missing argument to --account. You need to specify the account to operate on.",
                )?);
            },
            "--queue" => {
                raw.queue = Some(parse_single_arg_string(
                    &mut args,
                    cmd,
                    "Missing argument to --queue. You need to specify the queue to operate on.",
                )?);
            },
            "--message-id" => {
                raw.message_id = Some(parse_single_arg_string(
                    &mut args,
                    cmd,
                    "Missing argument to --message-id. You need to specify the id of the message.",
                )?);
            },
            "--ttl" => {
                raw.ttl = Some(parse_single_arg(&mut args, cmd, "Missing argument to --ttl.", |val, err| {
                    format!("Failed to parse {} as ttl: {}", val, err)
                })?);
            },
            "--hide" => {
                raw.hide = Some(parse_single_arg(&mut args, cmd, "Missing argument to --hide.", |val, err| {
                    format!("Failed to parse {} as hide: {}", val, err)
                })?);
            },
            "--limit" => {
                raw.limit = Some(parse_single_arg(&mut args, cmd, "Missing argument to --limit.", |val, err| {
                    format!("Failed to parse {} as limit: {}", val, err)
                })?);
            },
            "--marker" => {
                raw.marker = Some(parse_single_arg_string(&mut args, cmd, "Missing argument to --marker.")?);
            },
            "--all" => {
                raw.match_hidden = true;
            },
            "--wait" => {
                raw.wait = Some(parse_single_arg(&mut args, cmd, "Missing argument to --wait.", |val, err| {
                    format!("Failed to parse {} as wait: {}", val, err)
                })?);
            },
            "--detail" => {
                raw.detail = Some(parse_single_arg_string(&mut args, cmd, "Missing argument to --detail.")?);
            },
            "help" | "--help" => {
                return Err(ParsedArgs::ShowCommandHelp(None, cmd.clone()));
            },
            _ => {
                return Err(ParsedArgs::ShowCommandHelp(
                    Some(format!("Unrecognized argument {}", arg)),
                    cmd.clone(),
                ));
            },
        }
    }

    Ok(raw)
}

fn required(value: Option<String>, cmd: &Command, error_msg: &'static str) -> Result<String, ParsedArgs> {
    value.ok_or_else(|| ParsedArgs::ShowCommandHelp(Some(error_msg.to_string()), cmd.clone()))
}

fn entity_detail(raw: &RawArgs, default: EntityDetail, cmd: &Command) -> Result<EntityDetail, ParsedArgs> {
    raw.detail
        .as_ref()
        .map_or(Ok(default), |s| EntityDetail::parse(s).map_err(|err| invalid_detail(err, cmd)))
}

fn message_detail(raw: &RawArgs, default: MessageDetail, cmd: &Command) -> Result<MessageDetail, ParsedArgs> {
    raw.detail
        .as_ref()
        .map_or(Ok(default), |s| MessageDetail::parse(s).map_err(|err| invalid_detail(err, cmd)))
}

fn invalid_detail(err: EngineError, cmd: &Command) -> ParsedArgs {
    ParsedArgs::ShowCommandHelp(Some(err.to_string()), cmd.clone())
}

fn filter(raw: &RawArgs) -> Filter {
    Filter {
        marker:       raw.marker.clone(),
        limit:        raw.limit,
        match_hidden: raw.match_hidden,
        wait:         raw.wait.unwrap_or(0),
    }
}

fn attrs(raw: &RawArgs) -> Attrs {
    Attrs {
        ttl:  raw.ttl,
        hide: raw.hide,
    }
}

fn parse_account_cmd(mut args: Vec<String>) -> Result<Command, ParsedArgs> {
    match args.pop() {
        None => Err(ParsedArgs::ShowHelp(None)),
        Some(sub_cmd) => {
            let s: &str = &sub_cmd;
            match s {
                "list" => {
                    let cmd = Command::GetAccounts(Filter::default(), EntityDetail::Id);
                    let raw = parse_flags(args, &cmd)?;
                    let detail = entity_detail(&raw, EntityDetail::Id, &cmd)?;
                    Ok(Command::GetAccounts(filter(&raw), detail))
                },
                "delete" => {
                    let cmd = Command::DeleteAccounts(Filter::default(), EntityDetail::None);
                    let raw = parse_flags(args, &cmd)?;
                    let detail = entity_detail(&raw, EntityDetail::None, &cmd)?;
                    Ok(Command::DeleteAccounts(filter(&raw), detail))
                },
                "help" => Err(ParsedArgs::ShowHelp(None)),
                _ => Err(ParsedArgs::ShowHelp(Some(format!("Unrecognized account subcommand {}", sub_cmd)))),
            }
        },
    }
}

fn parse_queue_cmd(mut args: Vec<String>) -> Result<Command, ParsedArgs> {
    match args.pop() {
        None => Err(ParsedArgs::ShowHelp(None)),
        Some(sub_cmd) => {
            let s: &str = &sub_cmd;
            match s {
                "list" => {
                    let cmd = Command::GetQueues(String::new(), Filter::default(), EntityDetail::Id);
                    let raw = parse_flags(args, &cmd)?;
                    let account = required(raw.account.clone(), &cmd, "You have to specify an account with --account.")?;
                    let detail = entity_detail(&raw, EntityDetail::Id, &cmd)?;
                    Ok(Command::GetQueues(account, filter(&raw), detail))
                },
                "delete" => {
                    let cmd = Command::DeleteQueues(String::new(), Filter::default(), EntityDetail::None);
                    let raw = parse_flags(args, &cmd)?;
                    let account = required(raw.account.clone(), &cmd, "You have to specify an account with --account.")?;
                    let detail = entity_detail(&raw, EntityDetail::None, &cmd)?;
                    Ok(Command::DeleteQueues(account, filter(&raw), detail))
                },
                "help" => Err(ParsedArgs::ShowHelp(None)),
                _ => Err(ParsedArgs::ShowHelp(Some(format!("Unrecognized queue subcommand {}", sub_cmd)))),
            }
        },
    }
}

fn parse_message_cmd(mut args: Vec<String>) -> Result<Command, ParsedArgs> {
    match args.pop() {
        None => Err(ParsedArgs::ShowHelp(None)),
        Some(sub_cmd) => {
            let s: &str = &sub_cmd;
            match s {
                "list" => {
                    let cmd = Command::GetMessages(String::new(), String::new(), Filter::default(), MessageDetail::All);
                    let raw = parse_flags(args, &cmd)?;
                    let (account, queue) = required_account_and_queue(&raw, &cmd)?;
                    let detail = message_detail(&raw, MessageDetail::All, &cmd)?;
                    Ok(Command::GetMessages(account, queue, filter(&raw), detail))
                },
                "delete" => {
                    let cmd = Command::DeleteMessages(String::new(), String::new(), Filter::default(), MessageDetail::None);
                    let raw = parse_flags(args, &cmd)?;
                    let (account, queue) = required_account_and_queue(&raw, &cmd)?;
                    let detail = message_detail(&raw, MessageDetail::None, &cmd)?;
                    Ok(match raw.message_id.clone() {
                        Some(id) => Command::DeleteMessage(account, queue, id, detail),
                        None => Command::DeleteMessages(account, queue, filter(&raw), detail),
                    })
                },
                "update" => {
                    let cmd = Command::UpdateMessages(
                        String::new(),
                        String::new(),
                        Filter::default(),
                        Attrs::default(),
                        MessageDetail::None,
                    );
                    let raw = parse_flags(args, &cmd)?;
                    let (account, queue) = required_account_and_queue(&raw, &cmd)?;
                    let detail = message_detail(&raw, MessageDetail::None, &cmd)?;
                    Ok(match raw.message_id.clone() {
                        Some(id) => Command::UpdateMessage(account, queue, id, attrs(&raw), detail),
                        None => Command::UpdateMessages(account, queue, filter(&raw), attrs(&raw), detail),
                    })
                },
                "get" => {
                    let cmd = Command::GetMessage(String::new(), String::new(), String::new(), MessageDetail::All);
                    let raw = parse_flags(args, &cmd)?;
                    let (account, queue) = required_account_and_queue(&raw, &cmd)?;
                    let id = required(
                        raw.message_id.clone(),
                        &cmd,
                        "You have to specify the message id with --message-id.",
                    )?;
                    let detail = message_detail(&raw, MessageDetail::All, &cmd)?;
                    Ok(Command::GetMessage(account, queue, id, detail))
                },
                "create" => {
                    let cmd = Command::CreateMessage(String::new(), String::new(), String::new(), Vec::new(), Attrs::default());
                    let raw = parse_flags(args, &cmd)?;
                    let (account, queue) = required_account_and_queue(&raw, &cmd)?;
                    let id = required(
                        raw.message_id.clone(),
                        &cmd,
                        "You have to specify the message id with --message-id.",
                    )?;
                    let mut body = Vec::new();
                    stdin()
                        .read_to_end(&mut body)
                        .map_err(|err| ParsedArgs::ShowCommandHelp(Some(format!("Failed to read message from stdin: {}", err)), cmd.clone()))?;
                    Ok(Command::CreateMessage(account, queue, id, body, attrs(&raw)))
                },
                "help" => Err(ParsedArgs::ShowHelp(None)),
                _ => Err(ParsedArgs::ShowHelp(Some(format!("Unrecognized message subcommand {}", sub_cmd)))),
            }
        },
    }
}

fn required_account_and_queue(raw: &RawArgs, cmd: &Command) -> Result<(String, String), ParsedArgs> {
    let account = required(raw.account.clone(), cmd, "You have to specify an account with --account.")?;
    let queue = required(raw.queue.clone(), cmd, "You have to specify a queue with --queue.")?;
    Ok((account, queue))
}
