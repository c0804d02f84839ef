use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::{Duration, sleep};
use tracing::info;

use courier_core::impls::{DispatchingExecutor, InMemoryQueue};
use courier_core::observability::init_tracing;
use courier_core::{
    Handler, HandlerError, HandlerModule, HandlerRegistry, Message, MessageEnvelope, MessageKind,
    MessageProcessorBuilder, ProcessorConfig, RegistryBuilder, RegistryError,
};

/// Fields shared by every bank command.
#[derive(Debug, Serialize, Deserialize)]
struct Command {
    command_id: String,
}

impl Message for Command {
    const KIND: MessageKind = MessageKind::new("bank.command");
}

#[derive(Debug, Serialize, Deserialize)]
struct Deposit {
    #[serde(flatten)]
    command: Command,
    amount: i64,
}

impl Message for Deposit {
    const KIND: MessageKind = MessageKind::with_ancestors("bank.deposit", &["bank.command"]);
}

#[derive(Debug, Serialize, Deserialize)]
struct Withdraw {
    #[serde(flatten)]
    command: Command,
    amount: i64,
}

impl Message for Withdraw {
    const KIND: MessageKind = MessageKind::with_ancestors("bank.withdraw", &["bank.command"]);
}

struct AccountHandler {
    balance: Arc<AtomicI64>,
}

#[async_trait]
impl Handler<Deposit> for AccountHandler {
    async fn handle(&self, message: Deposit) -> Result<(), HandlerError> {
        let balance = self.balance.fetch_add(message.amount, Ordering::SeqCst) + message.amount;
        info!(command_id = %message.command.command_id, balance, "deposited");
        Ok(())
    }
}

#[async_trait]
impl Handler<Withdraw> for AccountHandler {
    async fn handle(&self, message: Withdraw) -> Result<(), HandlerError> {
        let amount = message.amount;
        let previous = self
            .balance
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |balance| {
                (balance >= amount).then(|| balance - amount)
            })
            .map_err(|current| {
                HandlerError::failed(format!(
                    "insufficient funds: balance={current} requested={amount}"
                ))
            })?;
        info!(command_id = %message.command.command_id, balance = previous - amount, "withdrew");
        Ok(())
    }
}

/// Sees every command, whatever its concrete kind.
struct AuditHandler;

#[async_trait]
impl Handler<Command> for AuditHandler {
    async fn handle(&self, message: Command) -> Result<(), HandlerError> {
        info!(command_id = %message.command_id, "audited");
        Ok(())
    }
}

struct BankModule {
    balance: Arc<AtomicI64>,
}

impl HandlerModule for BankModule {
    fn register(&self, registry: &mut RegistryBuilder) -> Result<(), RegistryError> {
        let balance = Arc::clone(&self.balance);
        registry
            .register(move || Ok(AccountHandler { balance }))?
            .capability::<Deposit>()
            .capability::<Withdraw>();
        registry.register(|| Ok(AuditHandler))?.capability::<Command>();
        Ok(())
    }
}

fn command(id: &str) -> Command {
    Command {
        command_id: id.to_string(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = ProcessorConfig::load()?;

    // (A) registry from explicit modules
    let balance = Arc::new(AtomicI64::new(0));
    let registry = Arc::new(HandlerRegistry::discover(&[&BankModule {
        balance: Arc::clone(&balance),
    }])?);
    info!(bindings = registry.len(), "handler registry ready");

    // (B) queue with one command that will fail
    let queue = Arc::new(InMemoryQueue::new("bank-commands"));
    queue
        .enqueue(MessageEnvelope::new(&Deposit {
            command: command("c-1"),
            amount: 100,
        })?)
        .await;
    queue
        .enqueue(MessageEnvelope::new(&Withdraw {
            command: command("c-2"),
            amount: 500,
        })?)
        .await;
    queue
        .enqueue(MessageEnvelope::new(&Withdraw {
            command: command("c-3"),
            amount: 40,
        })?)
        .await;

    // (C) processor: one DispatchingExecutor per worker
    let processor = MessageProcessorBuilder::from_config(&config)
        .queue(Arc::clone(&queue))
        .build(|| DispatchingExecutor::new(Arc::clone(&registry)))?;
    processor.start();

    // (D) drain, then stop
    while !queue.is_empty().await {
        sleep(Duration::from_millis(20)).await;
    }
    processor.shutdown_and_join().await;

    info!(balance = balance.load(Ordering::SeqCst), "done");
    Ok(())
}
