//! Parsing of `CLUSTER NODES` output.
//!
//! Each line reads
//! `<id> <ip:port@cport[,hostname]> <flags> <master> <ping> <pong> <epoch> <link> <slot>...`.
//! Only healthy primaries are kept; replicas never run bulk work.

use rebulk_engine::worker::SlotRange;
use rebulk_engine::PrimaryNode;

use crate::error::RedisWorkerError;

/// Primary nodes listed in `CLUSTER NODES` output, ordered by their first
/// slot. `seed_host` replaces an empty address, which a node reports for
/// itself before it has met any peer.
pub fn parse_cluster_nodes(
    output: &str,
    seed_host: &str,
) -> Result<Vec<PrimaryNode>, RedisWorkerError> {
    let mut nodes = Vec::new();

    for line in output.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 8 {
            return Err(RedisWorkerError::Topology(format!("Truncated line: {line}")));
        }

        let flags: Vec<&str> = fields[2].split(',').collect();
        if !flags.contains(&"master") || flags.iter().any(|f| matches!(*f, "fail" | "noaddr")) {
            continue;
        }

        let (host, port) = parse_address(fields[1])?;
        let host = if host.is_empty() { seed_host } else { host };
        let slots = fields[8..]
            .iter()
            .filter(|s| !s.starts_with('['))
            .map(|s| parse_slot_range(s))
            .collect::<Result<Vec<_>, _>>()?;

        nodes.push(PrimaryNode::cluster(fields[0], host, port, slots));
    }

    nodes.sort_by_key(|n| n.slots.first().map_or(u16::MAX, |&(start, _)| start));
    Ok(nodes)
}

/// `ip:port@cport[,hostname]` to `(ip, port)`. IPv6 hosts keep their colons.
fn parse_address(field: &str) -> Result<(&str, u16), RedisWorkerError> {
    let addr = field.split(',').next().unwrap_or(field);
    let addr = addr.split('@').next().unwrap_or(addr);
    let (host, port) = addr
        .rsplit_once(':')
        .ok_or_else(|| RedisWorkerError::Topology(format!("Invalid address: {field}")))?;
    let port = port
        .parse()
        .map_err(|_| RedisWorkerError::Topology(format!("Invalid port in address: {field}")))?;
    Ok((host, port))
}

fn parse_slot_range(field: &str) -> Result<SlotRange, RedisWorkerError> {
    let parse = |s: &str| {
        s.parse::<u16>()
            .map_err(|_| RedisWorkerError::Topology(format!("Invalid slot range: {field}")))
    };
    match field.split_once('-') {
        Some((start, end)) => Ok((parse(start)?, parse(end)?)),
        None => {
            let slot = parse(field)?;
            Ok((slot, slot))
        }
    }
}
