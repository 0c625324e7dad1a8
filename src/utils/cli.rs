use clap::Parser;

use crate::utils::types::Address;

/// One peer process of the Chord distributed hash table.
#[derive(Parser, Debug)]
#[command(name = "chord-dht")]
pub struct Cli {
    /// host:port this node binds to and advertises to its peers
    pub address: Address,

    /// existing ring member to join via shortly after startup
    #[arg(short, long)]
    pub peer: Option<Address>,
}
