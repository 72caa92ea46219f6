// Snowflake-style id generator
// 64-bit layout: [timestamp_ms:42][node_id:10][sequence:12], rendered as decimal strings

use std::sync::Mutex;

const NODE_BITS: u64 = 10;
const SEQUENCE_BITS: u64 = 12;
const MAX_NODE_ID: u16 = (1 << NODE_BITS) - 1;
const SEQUENCE_MASK: u64 = (1 << SEQUENCE_BITS) - 1;
const TIMESTAMP_MASK: u64 = (1 << 42) - 1;

#[derive(Debug, Default)]
struct GeneratorState {
    last_timestamp: u64,
    sequence: u64,
}

/// 1024 nodes, 4096 ids per millisecond per node
#[derive(Debug)]
pub struct IdGenerator {
    node_id: u16,
    state: Mutex<GeneratorState>,
}

fn now_millis() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}

impl IdGenerator {
    pub fn new(node_id: u16) -> Self {
        assert!(node_id <= MAX_NODE_ID, "Node ID must be less than 1024");

        Self {
            node_id,
            state: Mutex::new(GeneratorState::default()),
        }
    }

    pub fn next_raw(&self) -> i64 {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut now = now_millis();
        // Never go backwards, even if the wall clock does
        if now < state.last_timestamp {
            now = state.last_timestamp;
        }

        if now == state.last_timestamp {
            state.sequence = (state.sequence + 1) & SEQUENCE_MASK;
            if state.sequence == 0 {
                // Sequence exhausted for this millisecond - spin to the next one
                while now <= state.last_timestamp {
                    std::hint::spin_loop();
                    now = now_millis().max(now);
                }
            }
        } else {
            state.sequence = 0;
        }
        state.last_timestamp = now;

        let id = ((now & TIMESTAMP_MASK) << (NODE_BITS + SEQUENCE_BITS))
            | ((self.node_id as u64) << SEQUENCE_BITS)
            | state.sequence;

        id as i64
    }

    pub fn next_id(&self) -> String {
        self.next_raw().to_string()
    }
}
