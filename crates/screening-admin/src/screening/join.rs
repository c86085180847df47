use super::domain::{Child, ChildId, User, UserId};
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use tracing::warn;

/// Placeholder shown in child columns of a tutor without resolved children.
pub const NOT_AVAILABLE: &str = "N/A";

/// Per-view record joining a tutor to at most one child.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Row {
    pub tutor_id: UserId,
    pub tutor_name: String,
    pub child_id: Option<ChildId>,
    pub child_name: String,
    #[serde(serialize_with = "serialize_age_cell")]
    pub child_age: Option<u32>,
    pub is_child: bool,
}

impl Row {
    fn for_child(user: &User, child: Child) -> Self {
        Self {
            tutor_id: user.id.clone(),
            tutor_name: user.name.clone(),
            child_id: Some(child.id),
            child_name: child.name,
            child_age: child.age,
            is_child: true,
        }
    }

    fn fallback(user: &User) -> Self {
        Self {
            tutor_id: user.id.clone(),
            tutor_name: user.name.clone(),
            child_id: None,
            child_name: NOT_AVAILABLE.to_string(),
            child_age: None,
            is_child: false,
        }
    }

    /// Identifier shown in the first table column.
    pub fn display_id(&self) -> &str {
        self.child_id
            .as_ref()
            .map_or(self.tutor_id.as_str(), ChildId::as_str)
    }

    pub fn child_age_label(&self) -> String {
        age_cell(self.child_age)
    }
}

fn age_cell(age: Option<u32>) -> String {
    age.map_or_else(|| NOT_AVAILABLE.to_string(), |age| age.to_string())
}

fn serialize_age_cell<S>(age: &Option<u32>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match age {
        Some(age) => serializer.serialize_u32(*age),
        None => serializer.serialize_str(NOT_AVAILABLE),
    }
}

/// Failure to resolve the children of a single tutor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("children for user {user} unavailable: {reason}")]
pub struct ChildResolutionError {
    pub user: UserId,
    pub reason: String,
}

/// Source of the children owned by a tutor, consulted once per user.
pub trait ChildResolver {
    fn children_of(&self, user: &UserId) -> Result<Vec<Child>, ChildResolutionError>;
}

impl<F> ChildResolver for F
where
    F: Fn(&UserId) -> Result<Vec<Child>, ChildResolutionError>,
{
    fn children_of(&self, user: &UserId) -> Result<Vec<Child>, ChildResolutionError> {
        self(user)
    }
}

/// Children grouped by owning tutor, built from one bulk fetch.
///
/// Order within each group follows the order the children were fetched in.
/// An index built from a failed fetch fails every lookup, so each tutor
/// degrades to its fallback row exactly as a failed per-user fetch would.
#[derive(Debug, Clone, Default)]
pub struct ChildIndex {
    by_owner: HashMap<UserId, Vec<Child>>,
    unavailable: Option<String>,
}

impl ChildIndex {
    pub fn from_children(children: impl IntoIterator<Item = Child>) -> Self {
        let mut by_owner: HashMap<UserId, Vec<Child>> = HashMap::new();
        for child in children {
            by_owner.entry(child.user_id.clone()).or_default().push(child);
        }

        Self {
            by_owner,
            unavailable: None,
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            by_owner: HashMap::new(),
            unavailable: Some(reason.into()),
        }
    }
}

impl ChildResolver for ChildIndex {
    fn children_of(&self, user: &UserId) -> Result<Vec<Child>, ChildResolutionError> {
        if let Some(reason) = &self.unavailable {
            return Err(ChildResolutionError {
                user: user.clone(),
                reason: reason.clone(),
            });
        }

        Ok(self.by_owner.get(user).cloned().unwrap_or_default())
    }
}

/// Flattens tutors and their children into display rows.
///
/// User order is preserved. A tutor with children yields one row per child, a
/// tutor without children (or whose lookup failed) yields one fallback row.
/// Children are only reached through their owner, so orphans never appear.
pub fn join_rows<R>(users: &[User], resolver: &R) -> Vec<Row>
where
    R: ChildResolver + ?Sized,
{
    let mut rows = Vec::with_capacity(users.len());

    for user in users {
        match resolver.children_of(&user.id) {
            Ok(children) if children.is_empty() => rows.push(Row::fallback(user)),
            Ok(children) => rows.extend(
                children
                    .into_iter()
                    .map(|child| Row::for_child(user, child)),
            ),
            Err(err) => {
                warn!(user_id = %user.id, error = %err, "child lookup failed; using fallback row");
                rows.push(Row::fallback(user));
            }
        }
    }

    rows
}

/// Totals shown beside the roster table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterSummary {
    pub tutor_count: usize,
    pub child_count: usize,
    pub tutors_without_children: usize,
}

impl RosterSummary {
    pub fn from_rows(rows: &[Row]) -> Self {
        let mut tutors: Vec<&UserId> = rows.iter().map(|row| &row.tutor_id).collect();
        tutors.sort();
        tutors.dedup();

        Self {
            tutor_count: tutors.len(),
            child_count: rows.iter().filter(|row| row.is_child).count(),
            tutors_without_children: rows.iter().filter(|row| !row.is_child).count(),
        }
    }
}
