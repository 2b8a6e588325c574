//! Entity descriptors and the name-keyed registry that resolves them.
//!
//! Relations name their target entity by string, never by type, so two entity
//! modules can point at each other (User <-> Group) without importing each
//! other. The registry is built once on first access and resolves a target the
//! first time a relation is traversed.
//!
//! Adding an entity: declare its `DESCRIPTOR` in its module and append it to
//! `ENTITIES`.

use crate::core::error::WardenError;
use crate::entities::{field, form, group, privilege, response, scope, user};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Scope,
    Privilege,
    Group,
    User,
    Field,
    Form,
    Response,
}

impl EntityKind {
    pub const ALL: [EntityKind; 7] = [
        EntityKind::Scope,
        EntityKind::Privilege,
        EntityKind::Group,
        EntityKind::User,
        EntityKind::Field,
        EntityKind::Form,
        EntityKind::Response,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            EntityKind::Scope => "scope",
            EntityKind::Privilege => "privilege",
            EntityKind::Group => "group",
            EntityKind::User => "user",
            EntityKind::Field => "field",
            EntityKind::Form => "form",
            EntityKind::Response => "response",
        }
    }

    pub fn descriptor(&self) -> Result<&'static EntityDescriptor, WardenError> {
        registry().resolve(self.name())
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EntityKind {
    type Err = WardenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        EntityKind::ALL
            .into_iter()
            .find(|k| k.name() == wanted || registry_table_matches(*k, &wanted))
            .ok_or_else(|| WardenError::Validation(format!("Unknown entity kind: '{}'", s)))
    }
}

fn registry_table_matches(kind: EntityKind, wanted: &str) -> bool {
    kind.descriptor().map(|d| d.table == wanted).unwrap_or(false)
}

/// How an owner row reaches its related rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// Owner holds a foreign key `column` pointing at the target's id.
    BelongsTo { column: &'static str },
    /// Target rows hold a foreign key `foreign_column` pointing at the owner's
    /// id. Deleting the owner cascades to them.
    HasMany { foreign_column: &'static str },
    /// Pairs recorded in the join table `through`. Deleting either side
    /// cascades to the join rows only.
    ManyToMany {
        through: &'static str,
        owner_column: &'static str,
        target_column: &'static str,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct Relation {
    pub name: &'static str,
    /// Entity-type name of the other side, resolved through the registry.
    pub target: &'static str,
    pub kind: RelationKind,
}

impl Relation {
    pub fn resolve_target(&self) -> Result<&'static EntityDescriptor, WardenError> {
        registry().resolve(self.target)
    }
}

#[derive(Debug)]
pub struct EntityDescriptor {
    pub kind: EntityKind,
    pub table: &'static str,
    /// Column whose value must be unique across the table (slug or email).
    pub identity_column: &'static str,
    pub relations: &'static [Relation],
}

impl EntityDescriptor {
    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn relation(&self, name: &str) -> Result<&'static Relation, WardenError> {
        self.relations
            .iter()
            .find(|r| r.name == name)
            .ok_or_else(|| {
                WardenError::Validation(format!(
                    "{} has no relation '{}' (known: {})",
                    self.name(),
                    name,
                    self.relations
                        .iter()
                        .map(|r| r.name)
                        .collect::<Vec<_>>()
                        .join(", ")
                ))
            })
    }
}

static ENTITIES: &[&EntityDescriptor] = &[
    &scope::DESCRIPTOR,
    &privilege::DESCRIPTOR,
    &group::DESCRIPTOR,
    &user::DESCRIPTOR,
    &field::DESCRIPTOR,
    &form::DESCRIPTOR,
    &response::DESCRIPTOR,
];

pub struct Registry {
    by_name: HashMap<&'static str, &'static EntityDescriptor>,
}

impl Registry {
    fn build() -> Self {
        let by_name = ENTITIES.iter().map(|d| (d.name(), *d)).collect();
        Self { by_name }
    }

    pub fn resolve(&self, name: &str) -> Result<&'static EntityDescriptor, WardenError> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| WardenError::Validation(format!("Unregistered entity type: '{}'", name)))
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &'static EntityDescriptor> + '_ {
        EntityKind::ALL
            .into_iter()
            .filter_map(|k| self.by_name.get(k.name()).copied())
    }

    /// Confirm every relation target resolves and every many-to-many relation
    /// has a mirror declared on its target over the same join table.
    pub fn check(&self) -> Result<(), WardenError> {
        for desc in self.descriptors() {
            for rel in desc.relations {
                let target = self.resolve(rel.target)?;
                if let RelationKind::ManyToMany {
                    through,
                    owner_column,
                    target_column,
                } = rel.kind
                {
                    let mirrored = target.relations.iter().any(|r| {
                        r.target == desc.name()
                            && r.kind
                                == RelationKind::ManyToMany {
                                    through,
                                    owner_column: target_column,
                                    target_column: owner_column,
                                }
                    });
                    if !mirrored {
                        return Err(WardenError::Validation(format!(
                            "{}.{} over {} has no mirror on {}",
                            desc.name(),
                            rel.name,
                            through,
                            target.name()
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

pub fn registry() -> &'static Registry {
    static REGISTRY: OnceLock<Registry> = OnceLock::new();
    REGISTRY.get_or_init(Registry::build)
}
