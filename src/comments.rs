use std::cmp::Reverse;

use crate::backing::KeyValueStore;
use crate::error::{Result, StoreError};
use crate::models::{Comment, Reactions, Reply};
use crate::store::{require_id, EventStore};

/// Which node a reaction lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionTarget<'a> {
    Comment(&'a str),
    Reply { parent_id: &'a str, reply_id: &'a str },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CommentSort {
    #[default]
    Newest,
    Oldest,
    Popular,
}

impl<B: KeyValueStore> EventStore<B> {
    pub fn add_comment(&mut self, event_id: &str, mut comment: Comment) -> Result<()> {
        require_id("comment id", &comment.id)?;
        if comment.event_id.is_empty() {
            comment.event_id = event_id.to_string();
        } else if comment.event_id != event_id {
            return Err(StoreError::Validation(format!(
                "comment {} belongs to event {}, not {event_id}",
                comment.id, comment.event_id
            )));
        }

        let event = self.event_mut(event_id)?;
        event.comments.push(comment);
        self.persist_events()
    }

    pub fn reply_to_comment(
        &mut self,
        event_id: &str,
        comment_id: &str,
        mut reply: Reply,
    ) -> Result<()> {
        require_id("reply id", &reply.id)?;
        if reply.parent_id.is_empty() {
            reply.parent_id = comment_id.to_string();
        } else if reply.parent_id != comment_id {
            return Err(StoreError::Validation(format!(
                "reply {} belongs to comment {}, not {comment_id}",
                reply.id, reply.parent_id
            )));
        }

        let comment = self.comment_mut(event_id, comment_id)?;
        comment.replies.push(reply);
        self.persist_events()
    }

    /// Single choice per user: the user leaves every bucket, then joins
    /// `reaction_id` unless they already held it (which toggles it off).
    pub fn react_to_comment(
        &mut self,
        event_id: &str,
        target: ReactionTarget<'_>,
        reaction_id: &str,
        user_id: &str,
    ) -> Result<()> {
        require_id("reaction id", reaction_id)?;
        require_id("user id", user_id)?;

        let reactions = match target {
            ReactionTarget::Comment(comment_id) => {
                &mut self.comment_mut(event_id, comment_id)?.reactions
            }
            ReactionTarget::Reply {
                parent_id,
                reply_id,
            } => {
                let parent = self.comment_mut(event_id, parent_id)?;
                &mut parent
                    .replies
                    .iter_mut()
                    .find(|r| r.id == reply_id)
                    .ok_or_else(|| StoreError::not_found("reply", reply_id))?
                    .reactions
            }
        };
        apply_reaction(reactions, reaction_id, user_id);
        self.persist_events()
    }

    pub fn edit_comment(&mut self, event_id: &str, comment_id: &str, content: &str) -> Result<()> {
        let comment = self.comment_mut(event_id, comment_id)?;
        comment.content = content.to_string();
        comment.is_edited = true;
        self.persist_events()
    }

    /// Removes the comment and, with it, all of its replies.
    pub fn delete_comment(&mut self, event_id: &str, comment_id: &str) -> Result<()> {
        let event = self.event_mut(event_id)?;
        let before = event.comments.len();
        event.comments.retain(|c| c.id != comment_id);
        if event.comments.len() == before {
            return Err(StoreError::not_found("comment", comment_id));
        }
        self.persist_events()
    }

    /// Reports are only logged; there is no moderation queue.
    pub fn report_comment(&self, event_id: &str, comment_id: &str) -> Result<()> {
        let event = self
            .get_event(event_id)
            .ok_or_else(|| StoreError::not_found("event", event_id))?;
        if event.find_comment(comment_id).is_none() {
            return Err(StoreError::not_found("comment", comment_id));
        }
        log::warn!("reported comment {comment_id} in event {event_id}");
        Ok(())
    }

    fn comment_mut(&mut self, event_id: &str, comment_id: &str) -> Result<&mut Comment> {
        self.event_mut(event_id)?
            .comments
            .iter_mut()
            .find(|c| c.id == comment_id)
            .ok_or_else(|| StoreError::not_found("comment", comment_id))
    }
}

pub fn apply_reaction(reactions: &mut Reactions, reaction_id: &str, user_id: &str) {
    let had_reaction = reactions
        .get(reaction_id)
        .is_some_and(|users| users.iter().any(|u| u == user_id));

    for users in reactions.values_mut() {
        users.retain(|u| u != user_id);
    }

    let bucket = reactions.entry(reaction_id.to_string()).or_default();
    if !had_reaction {
        bucket.push(user_id.to_string());
    }
}

/// Reaction the user currently holds, if any.
pub fn user_reaction<'a>(reactions: &'a Reactions, user_id: &str) -> Option<&'a str> {
    reactions
        .iter()
        .find(|(_, users)| users.iter().any(|u| u == user_id))
        .map(|(id, _)| id.as_str())
}

/// Sorted copy for display; the stored order is left alone.
pub fn sort_comments(comments: &[Comment], sort: CommentSort) -> Vec<Comment> {
    let mut sorted = comments.to_vec();
    match sort {
        CommentSort::Newest => sorted.sort_by_key(|c| Reverse(c.timestamp)),
        CommentSort::Oldest => sorted.sort_by_key(|c| c.timestamp),
        CommentSort::Popular => sorted.sort_by_key(|c| Reverse(c.reaction_count())),
    }
    sorted
}
