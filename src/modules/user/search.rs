// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::modules::{
    common::text::normalize_text,
    context::MailContext,
    directory::{Course, GroupMode, Participant, User},
    error::CourseMailResult,
};

/// Filter selecting the participants of a course a user may write to.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct UserSearch {
    pub course_id: u64,
    /// The searching user. Never part of the results.
    pub user_id: u64,
    pub role_id: Option<u64>,
    pub group_id: Option<u64>,
    /// Substring of the full name, ignoring case and accents.
    pub fullname: String,
    /// Users returned regardless of the other filters.
    pub include: Vec<u64>,
}

impl UserSearch {
    pub fn new(course_id: u64, user_id: u64) -> Self {
        Self {
            course_id,
            user_id,
            ..Default::default()
        }
    }

    /// Matching users ordered by full name then id.
    pub async fn search(
        &self,
        ctx: &MailContext,
        offset: usize,
        limit: usize,
    ) -> CourseMailResult<Vec<User>> {
        let users = self.run(ctx).await?;
        let limit = if limit == 0 { usize::MAX } else { limit };
        Ok(users.into_iter().skip(offset).take(limit).collect())
    }

    pub async fn count(&self, ctx: &MailContext) -> CourseMailResult<usize> {
        Ok(self.run(ctx).await?.len())
    }

    async fn run(&self, ctx: &MailContext) -> CourseMailResult<Vec<User>> {
        let course = ctx.courses.get(ctx.directory.as_ref(), self.course_id).await?;
        let participants = ctx.directory.participants(self.course_id)?;
        let groups = self.group_scope(ctx, &course, &participants)?;
        let include: AHashSet<u64> = self.include.iter().copied().collect();
        let fullname = normalize_text(&self.fullname);

        let mut users: Vec<(String, User)> = participants
            .into_iter()
            .filter(|p| p.user.id != self.user_id)
            .filter(|p| {
                include.contains(&p.user.id) || self.matches(&course, &groups, &fullname, p)
            })
            .map(|p| (normalize_text(&p.user.fullname()), p.user))
            .collect();
        users.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.id.cmp(&b.1.id)));
        debug!(
            "User search: course_id={}, user_id={}, matches={}",
            self.course_id,
            self.user_id,
            users.len()
        );
        Ok(users.into_iter().map(|(_, user)| user).collect())
    }

    fn matches(
        &self,
        course: &Course,
        groups: &GroupScope,
        fullname: &str,
        participant: &Participant,
    ) -> bool {
        participant.is_active()
            && (course.viewable_roles.is_empty()
                || participant
                    .role_ids
                    .iter()
                    .any(|r| course.viewable_roles.contains(r)))
            && self
                .role_id
                .is_none_or(|role_id| participant.role_ids.contains(&role_id))
            && (fullname.is_empty()
                || normalize_text(&participant.user.fullname()).contains(fullname))
            && groups.admits(participant)
    }

    /// Groups the searcher may pick recipients from under the course group mode.
    fn group_scope(
        &self,
        ctx: &MailContext,
        course: &Course,
        participants: &[Participant],
    ) -> CourseMailResult<GroupScope> {
        let scope = match course.groupmode {
            GroupMode::NoGroups => GroupScope::Any,
            GroupMode::VisibleGroups => match self.group_id {
                Some(group_id) => GroupScope::Only(vec![group_id]),
                None => GroupScope::Any,
            },
            GroupMode::SeparateGroups => {
                if ctx
                    .directory
                    .can_access_all_groups(self.course_id, self.user_id)?
                {
                    match self.group_id {
                        Some(group_id) => GroupScope::Only(vec![group_id]),
                        None => GroupScope::Any,
                    }
                } else {
                    let own: Vec<u64> = participants
                        .iter()
                        .find(|p| p.user.id == self.user_id)
                        .map(|p| p.group_ids.clone())
                        .unwrap_or_default();
                    match self.group_id {
                        Some(group_id) if own.contains(&group_id) => {
                            GroupScope::Only(vec![group_id])
                        }
                        Some(_) => GroupScope::Only(vec![]),
                        None => GroupScope::Only(own),
                    }
                }
            }
        };
        Ok(scope)
    }
}

enum GroupScope {
    Any,
    Only(Vec<u64>),
}

impl GroupScope {
    fn admits(&self, participant: &Participant) -> bool {
        match self {
            GroupScope::Any => true,
            GroupScope::Only(groups) => participant.group_ids.iter().any(|g| groups.contains(g)),
        }
    }
}
