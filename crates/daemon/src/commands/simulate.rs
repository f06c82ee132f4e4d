//! Simulate command - floods one message through a line of in-process nodes.

use anyhow::{bail, Context, Result};
use clap::Args;
use meshtalk_core::transport::memory::SpawnedNode;
use meshtalk_core::{Config, MemoryMesh, Message, NodeSnapshot, PrivatePolicy, Target};
use std::time::Duration;
use tracing::info;

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Node nicknames, linked in order (first - second - third ...)
    #[arg(long, value_delimiter = ',', default_value = "alice,bob,carol")]
    nodes: Vec<String>,

    /// Sender (defaults to the first node)
    #[arg(long)]
    from: Option<String>,

    /// Recipient nickname, or ALL for the global log
    #[arg(long, default_value = "ALL")]
    to: String,

    /// Message body
    #[arg(long, default_value = "hello mesh")]
    text: String,

    /// Edit the message to this text after sending
    #[arg(long)]
    edit: Option<String>,

    /// Delete the message mesh-wide after sending
    #[arg(long)]
    delete: bool,

    /// Also show private messages in the global log
    #[arg(long)]
    mirror_private: bool,

    /// How long to let the mesh settle between steps
    #[arg(long, default_value_t = 200)]
    settle_ms: u64,
}

pub async fn execute(args: SimulateArgs) -> Result<()> {
    if args.nodes.len() < 2 {
        bail!("need at least two nodes to form a mesh");
    }
    let from = args.from.clone().unwrap_or_else(|| args.nodes[0].clone());
    let settle = Duration::from_millis(args.settle_ms);

    let work_dir = std::env::temp_dir().join(format!("meshtalk-sim-{}", std::process::id()));
    let mesh = MemoryMesh::new(work_dir.join("spool"));

    let mut nodes: Vec<SpawnedNode> = Vec::with_capacity(args.nodes.len());
    for name in &args.nodes {
        let mut config = Config::with_nickname(name.clone());
        config.received_dir = work_dir.join(name).join("received");
        if args.mirror_private {
            config.private_policy = PrivatePolicy::MirrorToGlobal;
        }
        let node = mesh
            .spawn_node(config)
            .with_context(|| format!("failed to start node {}", name))?;
        nodes.push(node);
    }

    for pair in nodes.windows(2) {
        mesh.connect(&pair[0].peer_id, &pair[1].peer_id)?;
    }
    info!("Linked {} nodes: {}", nodes.len(), args.nodes.join(" - "));

    let sender = args
        .nodes
        .iter()
        .position(|n| *n == from)
        .map(|i| &nodes[i].handle)
        .with_context(|| format!("unknown sender {}", from))?;

    let target = Target::from_wire(&args.to);
    let id = sender.send_text(target, args.text.clone()).await?;
    info!("{} sent {} to {}", from, id, args.to);
    tokio::time::sleep(settle).await;

    if let Some(new_text) = &args.edit {
        sender.edit_message(id.clone(), new_text.clone()).await?;
        info!("{} edited {}", from, id);
        tokio::time::sleep(settle).await;
    }

    if args.delete {
        sender.delete_message(id.clone(), false).await?;
        info!("{} deleted {}", from, id);
        tokio::time::sleep(settle).await;
    }

    for node in &nodes {
        print_snapshot(&node.handle.snapshot().await?);
    }

    for node in nodes {
        node.handle.shutdown();
        let _ = node.task.await;
    }
    let _ = std::fs::remove_dir_all(&work_dir);

    Ok(())
}

fn print_snapshot(snapshot: &NodeSnapshot) {
    println!();
    println!("== {} ({} neighbors)", snapshot.nickname, snapshot.neighbors.len());

    println!("  Global:");
    if snapshot.global.is_empty() {
        println!("    (empty)");
    }
    for msg in &snapshot.global {
        println!("    {}", format_message(msg));
    }

    for (partner, log) in &snapshot.private {
        println!(
            "  Private with {} ({} unread):",
            partner,
            snapshot.unread_count(partner)
        );
        for msg in log {
            println!("    {}", format_message(msg));
        }
    }
}

fn format_message(msg: &Message) -> String {
    let marker = match &msg.private_from {
        Some(partner) => format!(" [private from {}]", partner),
        None => String::new(),
    };
    format!(
        "{} {}: {}{}",
        msg.timestamp.format("%H:%M:%S"),
        msg.sender_name,
        msg.text,
        marker
    )
}
