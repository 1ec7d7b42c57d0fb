// Ordered text/page/embed/image blocks. An embed result is applied only if the
// block still has the revision captured before the fetch.

use serde::{Deserialize, Serialize};

use crate::collection::{new_id, Collection, Entity};
use crate::error::{AppError, Result};
use crate::preview::LinkPreview;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    Text,
    Page,
    Embed,
    Image,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl From<LinkPreview> for BlockMetadata {
    fn from(preview: LinkPreview) -> Self {
        Self {
            title: preview.title,
            description: preview.description,
            thumbnail: preview.image,
            url: Some(preview.url),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: BlockKind,
    pub content: String,
    #[serde(default)]
    pub metadata: BlockMetadata,
    /// Bumped on every content change.
    #[serde(default)]
    pub revision: u64,
}

impl Entity for Block {
    const KIND: &'static str = "Block";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewBlock {
    #[serde(rename = "type")]
    pub kind: BlockKind,
    /// Insert position; appended when absent.
    #[serde(default)]
    pub index: Option<usize>,
}

/// Proof of which block state an embed fetch was started against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedTicket {
    pub block_id: String,
    pub revision: u64,
}

#[derive(Debug, Clone, Default)]
pub struct BlockEditor {
    blocks: Collection<Block>,
}

impl BlockEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list(&self) -> &[Block] {
        self.blocks.as_slice()
    }

    pub fn get(&self, id: &str) -> Result<&Block> {
        self.blocks.get(id)
    }

    pub fn add(&mut self, new: NewBlock) -> &Block {
        let block = Block {
            id: new_id(),
            kind: new.kind,
            content: String::new(),
            metadata: BlockMetadata::default(),
            revision: 0,
        };
        let index = new.index.unwrap_or(self.blocks.len());
        self.blocks.insert(index, block)
    }

    pub fn update_content(&mut self, id: &str, content: String) -> Result<&Block> {
        self.blocks.update(id, |block| {
            block.content = content;
            block.revision += 1;
        })
    }

    pub fn delete(&mut self, id: &str) -> Result<Block> {
        self.blocks.remove(id)
    }

    pub fn reorder(&mut self, from: usize, to: usize) -> Result<()> {
        self.blocks.reorder(from, to)
    }

    pub fn begin_embed(&self, id: &str) -> Result<EmbedTicket> {
        let block = self.blocks.get(id)?;
        Ok(EmbedTicket {
            block_id: block.id.clone(),
            revision: block.revision,
        })
    }

    /// Turn the block into an embed of `preview.url`, unless it changed since `ticket` was taken.
    pub fn finish_embed(&mut self, ticket: &EmbedTicket, preview: LinkPreview) -> Result<&Block> {
        let current = match self.blocks.get(&ticket.block_id) {
            Ok(block) => block.revision,
            Err(_) => {
                return Err(AppError::Stale(format!(
                    "block {} was deleted while its preview was loading",
                    ticket.block_id
                )))
            }
        };
        if current != ticket.revision {
            return Err(AppError::Stale(format!(
                "block {} changed while its preview was loading",
                ticket.block_id
            )));
        }

        self.blocks.update(&ticket.block_id, |block| {
            block.kind = BlockKind::Embed;
            block.content = preview.url.clone();
            block.metadata = BlockMetadata::from(preview);
            block.revision += 1;
        })
    }
}
