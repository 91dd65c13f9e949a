//! Mutation requests.

use crate::selection::Selection;
use std::fmt;

/// The mutation forms the engine executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    Create,
    Update,
    Upsert,
    Delete,
    UpdateMany,
    DeleteMany,
}

impl MutationKind {
    /// Operation-name prefix (`createUser`, `updateManyUsers`).
    pub fn prefix(&self) -> &'static str {
        match self {
            MutationKind::Create => "create",
            MutationKind::Update => "update",
            MutationKind::Upsert => "upsert",
            MutationKind::Delete => "delete",
            MutationKind::UpdateMany => "updateMany",
            MutationKind::DeleteMany => "deleteMany",
        }
    }

    /// Whether this form targets a set of records and reports a count.
    pub fn is_bulk(&self) -> bool {
        matches!(self, MutationKind::UpdateMany | MutationKind::DeleteMany)
    }

    /// Split an operation name into its kind and type part. Bulk forms name
    /// the type by its capitalised plural (`deleteManyUsers` → `Users`).
    pub fn parse_operation(name: &str) -> Option<(MutationKind, &str)> {
        const ORDER: [MutationKind; 6] = [
            MutationKind::UpdateMany,
            MutationKind::DeleteMany,
            MutationKind::Create,
            MutationKind::Update,
            MutationKind::Upsert,
            MutationKind::Delete,
        ];
        ORDER.iter().find_map(|kind| {
            let rest = name.strip_prefix(kind.prefix())?;
            rest.starts_with(|c: char| c.is_ascii_uppercase())
                .then_some((*kind, rest))
        })
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// One mutation call: its kind, the entity type, the raw `input` object
/// and the field selections for `data` and `unalteredData`.
#[derive(Debug, Clone)]
pub struct MutationRequest {
    pub kind: MutationKind,
    pub type_name: String,
    pub input: serde_json::Value,
    pub selection: Selection,
    /// Selection for `unalteredData`; defaults to `selection`.
    pub unaltered_selection: Option<Selection>,
}

impl MutationRequest {
    pub fn new(kind: MutationKind, type_name: impl Into<String>, input: serde_json::Value) -> Self {
        Self {
            kind,
            type_name: type_name.into(),
            input,
            selection: Selection::new(),
            unaltered_selection: None,
        }
    }

    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = selection;
        self
    }

    pub fn with_unaltered_selection(mut self, selection: Selection) -> Self {
        self.unaltered_selection = Some(selection);
        self
    }

    /// The selection used for `unalteredData`.
    pub fn unaltered_selection(&self) -> &Selection {
        self.unaltered_selection.as_ref().unwrap_or(&self.selection)
    }
}
