//! Peer Address Pool
//!
//! Tracks which host addresses of the server subnet are taken and hands
//! out free ones at random.

use ipnet::Ipv4Net;
use rand::seq::IteratorRandom;
use std::collections::HashSet;
use std::net::Ipv4Addr;
use tracing::debug;

/// Pick a random host address of `subnet` that is not in `reserved`.
///
/// Returns `None` when every host address is taken.
pub fn pick_address(subnet: Ipv4Net, reserved: &HashSet<Ipv4Addr>) -> Option<Ipv4Addr> {
    subnet
        .hosts()
        .filter(|addr| !reserved.contains(addr))
        .choose(&mut rand::thread_rng())
}

/// Address pool for one subnet
///
/// Owns the reserved set. [`IpPool::allocate`] picks and reserves in one
/// step, so an address can never be handed out twice.
#[derive(Debug, Clone)]
pub struct IpPool {
    subnet: Ipv4Net,
    reserved: HashSet<Ipv4Addr>,
}

impl IpPool {
    /// Create a pool with the given permanently reserved addresses
    /// (gateway, server interface, ...)
    pub fn new(subnet: Ipv4Net, reserved: impl IntoIterator<Item = Ipv4Addr>) -> Self {
        let mut pool = Self {
            subnet: subnet.trunc(),
            reserved: HashSet::new(),
        };
        for addr in reserved {
            pool.reserve(addr);
        }
        pool
    }

    /// Subnet served by this pool
    pub fn subnet(&self) -> Ipv4Net {
        self.subnet
    }

    /// Allocate a free address and mark it reserved
    pub fn allocate(&mut self) -> Option<Ipv4Addr> {
        let addr = pick_address(self.subnet, &self.reserved)?;
        self.reserved.insert(addr);
        debug!("Allocated {} ({} left)", addr, self.available());
        Some(addr)
    }

    /// Mark an address as taken.
    ///
    /// Returns `false` if the address lies outside the subnet or was
    /// already reserved.
    pub fn reserve(&mut self, addr: Ipv4Addr) -> bool {
        if !self.subnet.contains(&addr) {
            return false;
        }
        self.reserved.insert(addr)
    }

    /// Return an address to the pool
    pub fn release(&mut self, addr: Ipv4Addr) {
        if self.reserved.remove(&addr) {
            debug!("Released {}", addr);
        }
    }

    /// Is the address taken?
    pub fn is_reserved(&self, addr: Ipv4Addr) -> bool {
        self.reserved.contains(&addr)
    }

    /// Number of free host addresses
    pub fn available(&self) -> usize {
        self.subnet
            .hosts()
            .filter(|addr| !self.reserved.contains(addr))
            .count()
    }
}
