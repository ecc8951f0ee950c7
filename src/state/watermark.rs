//! Read-receipt watermarks.
//!
//! Read state is a single monotonic watermark per reader: "all messages with
//! sequence number <= N are read". Receipts arriving out of order cannot
//! un-read anything because only a higher watermark advances the value.

use std::collections::HashMap;

/// Per-conversation map of reader id to highest read sequence number.
#[derive(Debug, Default, Clone)]
pub struct ReadWatermarks {
    readers: HashMap<String, u64>,
}

impl ReadWatermarks {
    /// Advance a reader's watermark. Returns `false` when `up_to_seq` does
    /// not exceed the current value (stale or duplicate receipt).
    pub fn advance(&mut self, reader_id: &str, up_to_seq: u64) -> bool {
        match self.readers.get(reader_id) {
            Some(&current) if current >= up_to_seq => false,
            _ => {
                self.readers.insert(reader_id.to_string(), up_to_seq);
                true
            }
        }
    }

    pub fn get(&self, reader_id: &str) -> Option<u64> {
        self.readers.get(reader_id).copied()
    }

    /// Whether the message with sequence number `seq` is read by `reader_id`.
    pub fn is_read(&self, reader_id: &str, seq: u64) -> bool {
        self.get(reader_id).is_some_and(|mark| seq <= mark)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watermark_covers_all_earlier_messages() {
        let mut marks = ReadWatermarks::default();
        assert!(marks.advance("ben", 7));

        for seq in 1..=7 {
            assert!(marks.is_read("ben", seq));
        }
        assert!(!marks.is_read("ben", 8));
    }

    #[test]
    fn test_out_of_order_receipt_does_not_regress() {
        let mut marks = ReadWatermarks::default();
        assert!(marks.advance("ben", 10));
        // A delayed receipt for an earlier point arrives late.
        assert!(!marks.advance("ben", 4));
        assert_eq!(marks.get("ben"), Some(10));
        assert!(marks.is_read("ben", 9));
    }

    #[test]
    fn test_readers_are_independent() {
        let mut marks = ReadWatermarks::default();
        marks.advance("ana", 3);
        marks.advance("ben", 8);

        assert!(marks.is_read("ben", 5));
        assert!(!marks.is_read("ana", 5));
        assert_eq!(marks.get("cleo"), None);
    }
}
