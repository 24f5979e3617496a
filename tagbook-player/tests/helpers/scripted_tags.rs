//! Tag source replaying a fixed sequence of reads

use async_trait::async_trait;
use std::collections::VecDeque;
use tagbook_player::input::TagSource;
use tagbook_player::{BookId, Result};

/// Returns the scripted reads in order, then "no tag" forever
#[derive(Debug, Default)]
pub struct ScriptedTags {
    reads: VecDeque<Option<BookId>>,
}

impl ScriptedTags {
    pub fn new(reads: Vec<Option<u32>>) -> Self {
        Self {
            reads: reads.into_iter().map(|r| r.map(BookId::from)).collect(),
        }
    }
}

#[async_trait]
impl TagSource for ScriptedTags {
    async fn read_tag(&mut self) -> Result<Option<BookId>> {
        Ok(self.reads.pop_front().flatten())
    }
}
