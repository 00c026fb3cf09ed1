use std::collections::HashMap;
use std::env;
use std::sync::Arc;

use tokio_stream::wrappers::ReceiverStream;
use tracing::warn;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use bank_core::csv::{read_ops, write_summary};
use bank_core::{Actor, Amount, CreateAccountRequest, Engine, TxRequest};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("warn".parse().unwrap()))
        .with_writer(std::io::stderr)
        .init();

    let path = env::args()
        .nth(1)
        .expect("usage: bank-core <operations.csv>");

    if !path.ends_with(".csv") {
        warn!(path, "input file seems to not be a csv file");
    }

    let engine = Arc::new(Engine::new());

    // acting identity for the replay; admin so every mutation is audited
    let operator = engine
        .create_account(
            &Actor::user(Uuid::nil()),
            CreateAccountRequest::new(
                "Replay Operator",
                "operator",
                "operator@replay.local",
                "replay",
            )
            .expect("operator account request")
            .with_initial_balance(Amount::ZERO)
            .expect("operator opening balance")
            .as_admin(),
        )
        .expect("failed to create operator account");
    let actor = Actor::admin(operator.id);

    let (op_sender, op_receiver) = tokio::sync::mpsc::channel(16);

    let reader_engine = Arc::clone(&engine);
    tokio::spawn(async move {
        let mut known = HashMap::new();
        for result in read_ops(&path) {
            let op = match result {
                Ok(op) => op,
                Err(e) => {
                    warn!("{e}");
                    continue;
                }
            };

            // accounts are created on first sight of a username
            let account_id = match known.get(&op.username) {
                Some(id) => *id,
                None => {
                    let request = match CreateAccountRequest::new(
                        op.username.clone(),
                        op.username.clone(),
                        format!("{}@replay.local", op.username),
                        "replay",
                    ) {
                        Ok(request) => request,
                        Err(e) => {
                            warn!(username = %op.username, "{e}");
                            continue;
                        }
                    };
                    match reader_engine.create_account(&actor, request) {
                        Ok(account) => {
                            known.insert(op.username.clone(), account.id);
                            account.id
                        }
                        Err(e) => {
                            warn!(username = %op.username, "{e}");
                            continue;
                        }
                    }
                }
            };

            let mut request = match TxRequest::new(account_id, op.kind, op.amount) {
                Ok(request) => request,
                Err(e) => {
                    warn!("{e}");
                    continue;
                }
            };
            if let Some(description) = op.description {
                request = request.with_description(description);
            }
            op_sender.send(request).await.unwrap();
        }
    });

    engine.run(&actor, ReceiverStream::new(op_receiver)).await;

    let accounts = engine.list_accounts().expect("failed to list accounts");
    write_summary(accounts.into_iter().filter(|a| a.id != operator.id));
}
