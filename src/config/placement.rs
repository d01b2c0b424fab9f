use serde::{Deserialize, Serialize};

use crate::preview::geometry::{AnchorKind, Placement};

/// Card offsets per anchor kind, relative to the anchor's bottom-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementTable {
    pub post: Placement,
    pub comment: Placement,
    pub reply: Placement,
    pub user_list: Placement,
}

impl PlacementTable {
    pub fn get(&self, kind: AnchorKind) -> Placement {
        match kind {
            AnchorKind::Post => self.post,
            AnchorKind::Comment => self.comment,
            AnchorKind::Reply => self.reply,
            AnchorKind::UserList => self.user_list,
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = (AnchorKind, Placement)> + '_ {
        [
            AnchorKind::Post,
            AnchorKind::Comment,
            AnchorKind::Reply,
            AnchorKind::UserList,
        ]
        .into_iter()
        .map(move |kind| (kind, self.get(kind)))
    }

    /// Replaces non-finite offsets with the defaults for that kind.
    pub(crate) fn sanitize(&mut self) {
        let defaults = PlacementTable::default();
        for (kind, placement) in self.entries().collect::<Vec<_>>() {
            if placement.offset_top.is_finite() && placement.offset_left.is_finite() {
                continue;
            }
            tracing::warn!(%kind, "non-finite card offset in config, using default");
            let fallback = defaults.get(kind);
            match kind {
                AnchorKind::Post => self.post = fallback,
                AnchorKind::Comment => self.comment = fallback,
                AnchorKind::Reply => self.reply = fallback,
                AnchorKind::UserList => self.user_list = fallback,
            }
        }
    }
}

impl Default for PlacementTable {
    fn default() -> Self {
        Self {
            post: Placement {
                offset_top: 8.0,
                offset_left: 0.0,
            },
            comment: Placement {
                offset_top: 28.0,
                offset_left: -56.0,
            },
            reply: Placement {
                offset_top: 4.0,
                offset_left: 0.0,
            },
            user_list: Placement {
                offset_top: 8.0,
                offset_left: 0.0,
            },
        }
    }
}
