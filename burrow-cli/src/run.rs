use crate::args::Command;
use burrow_client::{ClientError, Service};
use burrow_engine::{EntityProjection, MessageProjection};
use serde_json::{json, Value};

fn print_json(value: &Value) {
    println!("{}", serde_json::to_string_pretty(value).expect("failed to format value as json"));
}

fn message_value(projection: &MessageProjection) -> Value {
    match projection {
        MessageProjection::Id(id) => json!({ "id": id }),
        MessageProjection::Body(body) => json!({ "body": String::from_utf8_lossy(body) }),
        MessageProjection::Attributes { id, ttl, hide } => json!({ "id": id, "ttl": ttl, "hide": hide }),
        MessageProjection::All { id, ttl, hide, body } => {
            json!({ "id": id, "ttl": ttl, "hide": hide, "body": String::from_utf8_lossy(body) })
        },
    }
}

fn entity_value(projection: &EntityProjection) -> Value {
    match projection {
        EntityProjection::Id(id) | EntityProjection::All(id) => json!({ "id": id }),
    }
}

pub async fn run_command(host: &str, port: u16, cmd: Command) -> i32 {
    match run_command_for_result(host, port, cmd).await {
        Ok(code) => code,
        Err(err) => {
            print_json(&json!({ "err": err.to_string() }));

            1
        },
    }
}

async fn run_command_for_result(host: &str, port: u16, cmd: Command) -> Result<i32, ClientError> {
    let service = Service::new(&format_host(host, port));

    match cmd {
        Command::GetAccounts(filter, detail) => {
            let accounts = service.get_accounts(&filter, detail).await?;
            print_json(&Value::Array(accounts.iter().map(entity_value).collect()));
        },
        Command::DeleteAccounts(filter, detail) => {
            let accounts = service.delete_accounts(&filter, detail).await?;
            print_json(&Value::Array(accounts.iter().map(entity_value).collect()));
        },
        Command::GetQueues(account, filter, detail) => {
            let queues = service.get_queues(&account, &filter, detail).await?;
            print_json(&Value::Array(queues.iter().map(entity_value).collect()));
        },
        Command::DeleteQueues(account, filter, detail) => {
            let queues = service.delete_queues(&account, &filter, detail).await?;
            print_json(&Value::Array(queues.iter().map(entity_value).collect()));
        },
        Command::GetMessages(account, queue, filter, detail) => {
            let messages = service.get_messages(&account, &queue, &filter, detail).await?;
            print_json(&Value::Array(messages.iter().map(message_value).collect()));
        },
        Command::DeleteMessages(account, queue, filter, detail) => {
            let messages = service.delete_messages(&account, &queue, &filter, detail).await?;
            print_json(&Value::Array(messages.iter().map(message_value).collect()));
        },
        Command::UpdateMessages(account, queue, filter, attrs, detail) => {
            let messages = service.update_messages(&account, &queue, &filter, attrs, detail).await?;
            print_json(&Value::Array(messages.iter().map(message_value).collect()));
        },
        Command::GetMessage(account, queue, id, detail) => {
            let message = service.get_message(&account, &queue, &id, detail).await?;
            print_json(&message_value(&message));
        },
        Command::DeleteMessage(account, queue, id, detail) => {
            let message = service.delete_message(&account, &queue, &id, detail).await?;
            print_json(&message_value(&message));
        },
        Command::UpdateMessage(account, queue, id, attrs, detail) => {
            let message = service.update_message(&account, &queue, &id, attrs, detail).await?;
            print_json(&message_value(&message));
        },
        Command::CreateMessage(account, queue, id, body, attrs) => {
            let created = service.create_message(&account, &queue, &id, body, attrs).await?;
            print_json(&json!({ "created": created }));
        },
    }

    Ok(0)
}

// noinspection HttpUrlsUsage
fn format_host(host: &str, port: u16) -> String {
    if host.starts_with("http://") || host.starts_with("https://") {
        format!("{}:{}", host, port)
    } else {
        format!("http://{}:{}", host, port)
    }
}
