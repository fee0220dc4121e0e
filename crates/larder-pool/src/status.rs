//! Per-block status view of the pool.

use std::fmt;

use larder_core::PoolId;

/// State of one block at the moment the status was taken.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockStatus {
    /// Position of the block in pool order.
    pub index: usize,
    /// Capacity in bytes.
    pub size: usize,
    /// Current lessee, `None` while free.
    pub owner: Option<String>,
    /// Address of the first byte.
    pub address: usize,
}

/// Human-readable picture of the whole pool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolStatus {
    /// The pool described.
    pub pool: PoolId,
    /// Sum of all block sizes.
    pub total_bytes: usize,
    /// Sum of leased block sizes.
    pub used_bytes: usize,
    /// Every block, in pool order.
    pub blocks: Vec<BlockStatus>,
}

impl PoolStatus {
    /// Bytes not currently leased.
    pub fn free_bytes(&self) -> usize {
        self.total_bytes - self.used_bytes
    }

    /// Leased share in percent; zero for an empty pool.
    pub fn utilization(&self) -> f64 {
        if self.total_bytes == 0 {
            return 0.0;
        }
        self.used_bytes as f64 / self.total_bytes as f64 * 100.0
    }

    /// Number of leased blocks.
    pub fn used_blocks(&self) -> usize {
        self.blocks.iter().filter(|b| b.owner.is_some()).count()
    }
}

impl fmt::Display for PoolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Memory Pool Status ({}) ===", self.pool)?;
        writeln!(f, "Total pool size: {} bytes", self.total_bytes)?;
        writeln!(f, "Used memory: {} bytes", self.used_bytes)?;
        writeln!(f, "Free memory: {} bytes", self.free_bytes())?;
        writeln!(f, "Memory utilization: {:.1}%", self.utilization())?;
        writeln!(f, "Block details:")?;
        for block in &self.blocks {
            match &block.owner {
                Some(owner) => writeln!(
                    f,
                    "Block {}: {} bytes, USED by {} at {:#x}",
                    block.index, block.size, owner, block.address
                )?,
                None => writeln!(
                    f,
                    "Block {}: {} bytes, FREE at {:#x}",
                    block.index, block.size, block.address
                )?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status() -> PoolStatus {
        PoolStatus {
            pool: PoolId::next(),
            total_bytes: 320,
            used_bytes: 64,
            blocks: vec![
                BlockStatus {
                    index: 0,
                    size: 64,
                    owner: Some("TemperatureProcessor".into()),
                    address: 0x10,
                },
                BlockStatus {
                    index: 1,
                    size: 256,
                    owner: None,
                    address: 0x80,
                },
            ],
        }
    }

    #[test]
    fn derived_values() {
        let s = status();
        assert_eq!(s.free_bytes(), 256);
        assert_eq!(s.utilization(), 20.0);
        assert_eq!(s.used_blocks(), 1);
    }

    #[test]
    fn display_marks_free_and_used_blocks() {
        let text = status().to_string();
        assert!(text.contains("Block 0: 64 bytes, USED by TemperatureProcessor at 0x10"));
        assert!(text.contains("Block 1: 256 bytes, FREE at 0x80"));
        assert!(text.contains("Memory utilization: 20.0%"));
    }
}
