// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::modules::error::CourseMailResult;

/// Immutable snapshot of a participant identity owned by the directory.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub firstname: String,
    pub lastname: String,
    pub deleted: bool,
}

impl User {
    pub fn new(id: u64, firstname: &str, lastname: &str) -> Self {
        Self {
            id,
            firstname: firstname.to_string(),
            lastname: lastname.to_string(),
            deleted: false,
        }
    }

    pub fn fullname(&self) -> String {
        format!("{} {}", self.firstname, self.lastname)
            .trim()
            .to_string()
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum GroupMode {
    #[default]
    NoGroups,
    SeparateGroups,
    VisibleGroups,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: u64,
    pub shortname: String,
    pub fullname: String,
    pub groupmode: GroupMode,
    /// Roles whose holders may be picked as recipients. Empty means every role.
    pub viewable_roles: Vec<u64>,
}

/// Enrolment of a user in a course as seen by the directory.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub user: User,
    pub role_ids: Vec<u64>,
    pub group_ids: Vec<u64>,
    pub suspended: bool,
}

impl Participant {
    pub fn is_active(&self) -> bool {
        !self.suspended && !self.user.deleted
    }
}

/// Read-only view of the platform's user, course and enrolment data.
pub trait Directory: Send + Sync {
    fn user(&self, user_id: u64) -> CourseMailResult<Option<User>>;

    fn course(&self, course_id: u64) -> CourseMailResult<Option<Course>>;

    fn participants(&self, course_id: u64) -> CourseMailResult<Vec<Participant>>;

    fn participant(&self, course_id: u64, user_id: u64) -> CourseMailResult<Option<Participant>> {
        Ok(self
            .participants(course_id)?
            .into_iter()
            .find(|p| p.user.id == user_id))
    }

    /// Whether the user holds the capability to use mail in the course.
    fn can_use_mail(&self, course_id: u64, user_id: u64) -> CourseMailResult<bool>;

    fn can_access_all_groups(&self, course_id: u64, user_id: u64) -> CourseMailResult<bool>;
}

/// In-process directory, populated by the embedding application or by tests.
#[derive(Default)]
pub struct StaticDirectory {
    users: DashMap<u64, User>,
    courses: DashMap<u64, Course>,
    enrolments: DashMap<u64, Vec<Enrolment>>,
}

#[derive(Clone, Debug)]
struct Enrolment {
    user_id: u64,
    role_ids: Vec<u64>,
    group_ids: Vec<u64>,
    suspended: bool,
    can_use_mail: bool,
    all_groups: bool,
}

/// Options of a single enrolment in [`StaticDirectory::enrol`].
#[derive(Clone, Debug)]
pub struct EnrolOptions {
    pub role_ids: Vec<u64>,
    pub group_ids: Vec<u64>,
    pub suspended: bool,
    pub can_use_mail: bool,
    pub access_all_groups: bool,
}

impl Default for EnrolOptions {
    fn default() -> Self {
        Self {
            role_ids: vec![5],
            group_ids: vec![],
            suspended: false,
            can_use_mail: true,
            access_all_groups: false,
        }
    }
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, user: User) {
        self.users.insert(user.id, user);
    }

    pub fn add_course(&self, course: Course) {
        self.courses.insert(course.id, course);
    }

    /// Replaces any previous enrolment of the user in the course.
    pub fn enrol(&self, course_id: u64, user_id: u64, options: EnrolOptions) {
        let mut enrolments = self.enrolments.entry(course_id).or_default();
        enrolments.retain(|e| e.user_id != user_id);
        enrolments.push(Enrolment {
            user_id,
            role_ids: options.role_ids,
            group_ids: options.group_ids,
            suspended: options.suspended,
            can_use_mail: options.can_use_mail,
            all_groups: options.access_all_groups,
        });
    }

    fn enrolment(&self, course_id: u64, user_id: u64) -> Option<Enrolment> {
        self.enrolments
            .get(&course_id)
            .and_then(|list| list.iter().find(|e| e.user_id == user_id).cloned())
    }
}

impl Directory for StaticDirectory {
    fn user(&self, user_id: u64) -> CourseMailResult<Option<User>> {
        Ok(self.users.get(&user_id).map(|u| u.value().clone()))
    }

    fn course(&self, course_id: u64) -> CourseMailResult<Option<Course>> {
        Ok(self.courses.get(&course_id).map(|c| c.value().clone()))
    }

    fn participants(&self, course_id: u64) -> CourseMailResult<Vec<Participant>> {
        let Some(enrolments) = self.enrolments.get(&course_id) else {
            return Ok(vec![]);
        };
        Ok(enrolments
            .iter()
            .filter_map(|e| {
                self.users.get(&e.user_id).map(|user| Participant {
                    user: user.value().clone(),
                    role_ids: e.role_ids.clone(),
                    group_ids: e.group_ids.clone(),
                    suspended: e.suspended,
                })
            })
            .collect())
    }

    fn can_use_mail(&self, course_id: u64, user_id: u64) -> CourseMailResult<bool> {
        let user_ok = self.users.get(&user_id).is_some_and(|u| !u.deleted);
        Ok(user_ok
            && self
                .enrolment(course_id, user_id)
                .is_some_and(|e| e.can_use_mail && !e.suspended))
    }

    fn can_access_all_groups(&self, course_id: u64, user_id: u64) -> CourseMailResult<bool> {
        Ok(self
            .enrolment(course_id, user_id)
            .is_some_and(|e| e.all_groups))
    }
}
