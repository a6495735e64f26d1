//! Drive a node with synthetic radio traffic and print what its
//! resources report.
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example scripted_node -p plexi -- --packets 50

use anyhow::{Context as _, Result, bail};
use clap::Parser;
use plexi::{Configuration, LinkAddr, Plexi, Request, Response, SlotframeId};
use rand_chacha::ChaChaRng;
use rand_core::{Rng as _, SeedableRng as _};
use serde_json::json;
use std::path::PathBuf;

const FRAME: SlotframeId = SlotframeId::ONE;
const NEIGHBORS: [&str; 2] = ["215:8d00:57:6466", "216:8d00:57:6467"];

#[derive(Parser)]
struct Command {
    /// TOML configuration of the node
    #[arg(long)]
    config: Option<PathBuf>,

    /// packet events to simulate
    #[arg(long, default_value = "20")]
    packets: u32,

    #[arg(long, default_value = "42")]
    seed: u64,
}

fn main() -> Result<()> {
    env_logger::init();
    let cmd = Command::parse();

    let configuration = match &cmd.config {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            Configuration::from_toml_str(&content)?
        }
        None => Configuration::default().set_max_statistics(8),
    };
    let mut node = Plexi::new(configuration);

    request(
        &mut node,
        Request::post("6top/slotFrame").set_payload(json!({"frame": 1, "slots": 11}).to_string()),
    )?;
    for (slot, tna) in NEIGHBORS.iter().enumerate() {
        let neighbor: LinkAddr = tna.parse()?;
        node.neighbors_mut().insert(neighbor);
        let link = json!({"frame": 1, "slot": slot + 1, "option": 1, "tna": tna});
        request(&mut node, Request::post("6top/cellList").set_payload(link.to_string()))?;
        for metric in ["etx", "rssi"] {
            let stats = json!({"slot": slot + 1, "tna": tna, "metric": metric});
            request(&mut node, Request::post("6top/stats").set_payload(stats.to_string()))?;
        }
    }

    let mut rng = ChaChaRng::seed_from_u64(cmd.seed);
    for asn in 0..u64::from(cmd.packets) {
        let timeslot = 1 + (rng.next_u32() % 2) as u16;
        let sender: LinkAddr = NEIGHBORS[usize::from(timeslot - 1)].parse()?;
        if rng.next_u32() % 2 == 0 {
            let rssi = -40 - (rng.next_u32() % 50) as i16;
            node.on_packet_received(FRAME, timeslot, sender, rssi, 0, asn);
        } else {
            let transmissions = 1 + (rng.next_u32() % 4) as u8;
            node.on_packet_sent(FRAME, timeslot, true, transmissions);
        }
    }

    for path in ["6top/slotFrame", "6top/cellList", "6top/stats", "6top/nbrList"] {
        let response = request(&mut node, Request::get(path))?;
        println!("{path}: {}", response.json().cloned().unwrap_or_default());
    }

    Ok(())
}

fn request(node: &mut Plexi, request: Request) -> Result<Response> {
    let response = node.handle(&request);
    if !response.status().is_success() {
        bail!(
            "{:?} {} failed with {}: {}",
            request.method(),
            request.path(),
            response.status(),
            response.text().unwrap_or_default()
        );
    }
    Ok(response)
}
