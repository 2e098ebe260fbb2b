//! Declaration resolution.
//!
//! Resolution runs in three passes: check each declaration on its own,
//! collect every field edge, then match ref-side and many edges against
//! the far table's declarations. Matching is strict: a ref edge needs
//! exactly one candidate field edge, a many:many edge exactly one inverse,
//! unless a field or join table name disambiguates.

use std::sync::Arc;

use entgraph_common::types::DELETION_TIME_FIELD;
use entgraph_common::utils::error::ConfigError;
use entgraph_common::utils::hash::{FastHashMap, FastHashSet};
use indexmap::IndexMap;

use super::{
    Dependent, EdgeDescriptor, EdgeKind, EntSchema, ForeignKey, JoinMembership, TableMeta,
};
use crate::schema::{Cardinality, EdgeDecl, EdgeDeletion, EntDef, FieldDef, FieldType};
use crate::storage::{IndexDef, TableLayout};

/// Join-table fields used by self edges.
const SELF_JOIN_FIELDS: (&str, &str) = ("aId", "bId");

/// A field edge found among the declarations.
#[derive(Debug, Clone)]
struct FieldEdge {
    table: String,
    edge: String,
    field: String,
    far: String,
    optional: bool,
}

/// A ref-side edge that matched a field edge.
#[derive(Debug, Clone)]
struct Claim {
    cascade: EdgeDeletion,
    one_to_one: bool,
}

struct Resolver {
    decls: IndexMap<String, EntDef>,
    field_edges: Vec<FieldEdge>,
    claims: FastHashMap<(String, String), Claim>,
    join_tables: IndexMap<String, TableLayout>,
}

pub(super) fn resolve(defs: impl IntoIterator<Item = EntDef>) -> Result<EntSchema, ConfigError> {
    let mut decls: IndexMap<String, EntDef> = IndexMap::new();
    for def in defs {
        if decls.contains_key(&def.name) {
            return Err(ConfigError::DuplicateTable(def.name));
        }
        decls.insert(def.name.clone(), def);
    }
    for def in decls.values() {
        check_declaration(def, &decls)?;
    }

    let field_edges = decls
        .values()
        .flat_map(|def| {
            def.edges
                .iter()
                .filter(|e| e.is_field_edge())
                .map(|e| FieldEdge {
                    table: def.name.clone(),
                    edge: e.name.clone(),
                    field: e.field_name(),
                    far: e.far_table(),
                    optional: e.optional,
                })
        })
        .collect();

    let mut resolver = Resolver {
        decls,
        field_edges,
        claims: FastHashMap::default(),
        join_tables: IndexMap::new(),
    };

    let mut edges: IndexMap<String, Vec<EdgeDescriptor>> = IndexMap::new();
    let names: Vec<String> = resolver.decls.keys().cloned().collect();
    for name in &names {
        let def = resolver.decls[name].clone();
        let mut resolved = Vec::with_capacity(def.edges.len());
        for decl in &def.edges {
            resolved.extend(resolver.resolve_edge(&def, decl)?);
        }
        edges.insert(name.clone(), resolved);
    }

    for join in resolver.join_tables.keys() {
        if resolver.decls.contains_key(join) {
            return Err(ConfigError::InvalidDeclaration(format!(
                "join table `{join}` collides with a declared table"
            )));
        }
    }

    let mut tables = IndexMap::with_capacity(names.len());
    for (name, descriptors) in edges {
        let meta = resolver.table_meta(&name, descriptors)?;
        tables.insert(name, meta);
    }

    Ok(EntSchema {
        tables,
        join_tables: resolver.join_tables,
    })
}

fn invalid(msg: String) -> ConfigError {
    ConfigError::InvalidDeclaration(msg)
}

/// Returns the table an ID-valued field points into.
fn id_target(ty: &FieldType) -> Option<&str> {
    match ty {
        FieldType::Id(table) => Some(table),
        FieldType::Optional(inner) | FieldType::Array(inner) => id_target(inner),
        _ => None,
    }
}

/// Checks a table declaration in isolation.
fn check_declaration(def: &EntDef, decls: &IndexMap<String, EntDef>) -> Result<(), ConfigError> {
    let mut field_names = FastHashSet::default();
    for field in &def.fields {
        if field.name.starts_with('_') || field.name == DELETION_TIME_FIELD {
            return Err(invalid(format!(
                "`{}.{}` uses a reserved name",
                def.name, field.name
            )));
        }
        if !field_names.insert(field.name.as_str()) {
            return Err(invalid(format!(
                "field `{}` is declared more than once on `{}`",
                field.name, def.name
            )));
        }
        if let Some(target) = id_target(&field.ty) {
            if !decls.contains_key(target) {
                return Err(ConfigError::UnknownTable(target.to_string()));
            }
        }
        if let Some(default) = &field.default {
            if !field.ty.accepts(default) {
                return Err(invalid(format!(
                    "default of `{}.{}` does not match {}",
                    def.name, field.name, field.ty
                )));
            }
        }
    }

    let mut edge_names = FastHashSet::default();
    for edge in &def.edges {
        let far = edge.far_table();
        if !decls.contains_key(&far) {
            return Err(ConfigError::UnknownTable(far));
        }
        for name in std::iter::once(&edge.name).chain(edge.inverse.iter()) {
            if !edge_names.insert(name.as_str()) {
                return Err(ConfigError::DuplicateEdge {
                    table: def.name.clone(),
                    edge: name.clone(),
                });
            }
        }
        if edge.is_field_edge() {
            let field = edge.field_name();
            if field_names.contains(field.as_str()) {
                return Err(invalid(format!(
                    "`{}.{}` is both a field and the key of edge `{}`",
                    def.name, field, edge.name
                )));
            }
            if edge.deletion == EdgeDeletion::Soft {
                return Err(invalid(format!(
                    "soft cascade on `{}.{}` belongs on the ref side of the edge",
                    def.name, edge.name
                )));
            }
        } else if edge.optional {
            return Err(invalid(format!(
                "only field edges can be optional (`{}.{}`)",
                def.name, edge.name
            )));
        }
        if edge.inverse.is_some() && (edge.cardinality != Cardinality::Multiple || far != def.name)
        {
            return Err(invalid(format!(
                "`{}.{}`: inverse names apply to many:many self edges only",
                def.name, edge.name
            )));
        }
    }
    Ok(())
}

impl Resolver {
    fn resolve_edge(
        &mut self,
        def: &EntDef,
        decl: &EdgeDecl,
    ) -> Result<Vec<EdgeDescriptor>, ConfigError> {
        let far = decl.far_table();
        let descriptor = |kind| EdgeDescriptor {
            name: decl.name.clone(),
            table: def.name.clone(),
            far_table: far.clone(),
            kind,
        };

        match decl.cardinality {
            Cardinality::Single if !decl.is_ref => Ok(vec![descriptor(EdgeKind::Field {
                field: decl.field_name(),
                optional: decl.optional,
                unique: false,
            })]),
            Cardinality::Single => {
                let fe = self.match_field_edge(def, decl)?;
                if fe.optional {
                    return Err(ConfigError::BothEndsOptional {
                        table: fe.table,
                        edge: fe.edge,
                    });
                }
                self.claim(&fe, def, decl, true)?;
                Ok(vec![descriptor(EdgeKind::RefOne {
                    ref_field: fe.field,
                    cascade: decl.deletion,
                })])
            }
            Cardinality::Multiple if decl.is_ref => {
                let fe = self.match_field_edge(def, decl)?;
                self.claim(&fe, def, decl, false)?;
                Ok(vec![descriptor(EdgeKind::RefMany {
                    ref_field: fe.field,
                    cascade: decl.deletion,
                })])
            }
            Cardinality::Multiple if far == def.name => {
                self.reject_join_cascade(def, decl)?;
                let table = decl
                    .join_table
                    .clone()
                    .unwrap_or_else(|| format!("{}_{}", def.name, decl.name));
                let (a, b) = SELF_JOIN_FIELDS;
                self.register_join(&table, a, b)?;
                let forward = descriptor(EdgeKind::Join {
                    table: table.clone(),
                    field: a.to_string(),
                    ref_field: b.to_string(),
                    symmetric: decl.inverse.is_none(),
                });
                Ok(match &decl.inverse {
                    None => vec![forward],
                    Some(inverse) => vec![
                        forward,
                        EdgeDescriptor {
                            name: inverse.clone(),
                            table: def.name.clone(),
                            far_table: far.clone(),
                            kind: EdgeKind::Join {
                                table,
                                field: b.to_string(),
                                ref_field: a.to_string(),
                                symmetric: false,
                            },
                        },
                    ],
                })
            }
            Cardinality::Multiple => self.resolve_many(def, decl),
        }
    }

    /// Resolves a many edge to another table: 1:many when the far table
    /// holds a field edge back, many:many when it declares a many edge back.
    fn resolve_many(
        &mut self,
        def: &EntDef,
        decl: &EdgeDecl,
    ) -> Result<Vec<EdgeDescriptor>, ConfigError> {
        let far = decl.far_table();
        let ambiguous = || ConfigError::AmbiguousEdge {
            table: def.name.clone(),
            edge: decl.name.clone(),
            far_table: far.clone(),
        };
        let missing = || ConfigError::MissingInverse {
            table: def.name.clone(),
            edge: decl.name.clone(),
            far_table: far.clone(),
        };

        let field_candidates: Vec<FieldEdge> = self
            .field_edges
            .iter()
            .filter(|fe| fe.table == far && fe.far == def.name)
            .cloned()
            .collect();
        let many_candidates: Vec<EdgeDecl> = self.decls[&far]
            .edges
            .iter()
            .filter(|e| {
                e.cardinality == Cardinality::Multiple && !e.is_ref && e.far_table() == def.name
            })
            .cloned()
            .collect();

        let inverse = match &decl.join_table {
            Some(name) => {
                let exact: Vec<&EdgeDecl> = many_candidates
                    .iter()
                    .filter(|e| e.join_table.as_ref() == Some(name))
                    .collect();
                let unnamed: Vec<&EdgeDecl> = many_candidates
                    .iter()
                    .filter(|e| e.join_table.is_none())
                    .collect();
                match (exact.len(), unnamed.len()) {
                    (1, _) => exact[0].clone(),
                    (0, 1) => unnamed[0].clone(),
                    (0, 0) => return Err(missing()),
                    _ => return Err(ambiguous()),
                }
            }
            None => match (field_candidates.len(), many_candidates.len()) {
                (1, 0) => {
                    let fe = field_candidates[0].clone();
                    self.claim(&fe, def, decl, false)?;
                    return Ok(vec![EdgeDescriptor {
                        name: decl.name.clone(),
                        table: def.name.clone(),
                        far_table: far.clone(),
                        kind: EdgeKind::RefMany {
                            ref_field: fe.field,
                            cascade: decl.deletion,
                        },
                    }]);
                }
                (0, 1) => many_candidates[0].clone(),
                (0, 0) => return Err(missing()),
                _ => return Err(ambiguous()),
            },
        };

        self.reject_join_cascade(def, decl)?;
        let table = decl
            .join_table
            .clone()
            .or_else(|| inverse.join_table.clone())
            .unwrap_or_else(|| {
                let mut pair = [def.name.as_str(), far.as_str()];
                pair.sort_unstable();
                format!("{}_to_{}", pair[0], pair[1])
            });
        let field = format!("{}Id", def.name);
        let ref_field = format!("{far}Id");
        if field < ref_field {
            self.register_join(&table, &field, &ref_field)?;
        } else {
            self.register_join(&table, &ref_field, &field)?;
        }
        Ok(vec![EdgeDescriptor {
            name: decl.name.clone(),
            table: def.name.clone(),
            far_table: far,
            kind: EdgeKind::Join {
                table,
                field,
                ref_field,
                symmetric: false,
            },
        }])
    }

    /// Finds the single field edge on the far table that points back.
    fn match_field_edge(&self, def: &EntDef, decl: &EdgeDecl) -> Result<FieldEdge, ConfigError> {
        let far = decl.far_table();
        let candidates: Vec<&FieldEdge> = self
            .field_edges
            .iter()
            .filter(|fe| fe.table == far && fe.far == def.name)
            .filter(|fe| decl.ref_field.as_ref().is_none_or(|f| *f == fe.field))
            .collect();
        match candidates.as_slice() {
            [fe] => Ok((*fe).clone()),
            [] => Err(ConfigError::MissingInverse {
                table: def.name.clone(),
                edge: decl.name.clone(),
                far_table: far,
            }),
            _ => Err(ConfigError::AmbiguousEdge {
                table: def.name.clone(),
                edge: decl.name.clone(),
                far_table: far,
            }),
        }
    }

    fn claim(
        &mut self,
        fe: &FieldEdge,
        def: &EntDef,
        decl: &EdgeDecl,
        one_to_one: bool,
    ) -> Result<(), ConfigError> {
        if decl.deletion == EdgeDeletion::Soft && !self.decls[&fe.table].deletion.is_soft() {
            return Err(ConfigError::SoftCascadeIntoHardTable {
                table: def.name.clone(),
                edge: decl.name.clone(),
                far_table: fe.table.clone(),
            });
        }
        let key = (fe.table.clone(), fe.field.clone());
        if self.claims.contains_key(&key) {
            return Err(ConfigError::AmbiguousEdge {
                table: def.name.clone(),
                edge: decl.name.clone(),
                far_table: fe.table.clone(),
            });
        }
        self.claims.insert(
            key,
            Claim {
                cascade: decl.deletion,
                one_to_one,
            },
        );
        Ok(())
    }

    fn reject_join_cascade(&self, def: &EntDef, decl: &EdgeDecl) -> Result<(), ConfigError> {
        if decl.deletion == EdgeDeletion::Soft {
            return Err(invalid(format!(
                "many:many edge `{}.{}` cannot soft-cascade",
                def.name, decl.name
            )));
        }
        Ok(())
    }

    /// Registers a join table over `a` and `b`, or checks an existing one
    /// has the same ends.
    fn register_join(&mut self, table: &str, a: &str, b: &str) -> Result<(), ConfigError> {
        let compound = format!("{a}_{b}");
        if let Some(existing) = self.join_tables.get(table) {
            if existing.index(&compound).is_none() {
                return Err(invalid(format!(
                    "join table `{table}` is shared by edges with different ends"
                )));
            }
            return Ok(());
        }
        let mut layout = TableLayout::new(table);
        layout.add_index(IndexDef::new(a, [a]));
        layout.add_index(IndexDef::new(b, [b]));
        layout.add_index(IndexDef::new(compound, [a, b]));
        layout.add_index(IndexDef::new(format!("{b}_{a}"), [b, a]));
        self.join_tables.insert(table.to_string(), layout);
        Ok(())
    }

    fn table_meta(
        &self,
        name: &str,
        descriptors: Vec<EdgeDescriptor>,
    ) -> Result<TableMeta, ConfigError> {
        let def = &self.decls[name];

        let mut fields: IndexMap<String, FieldDef> = def
            .fields
            .iter()
            .map(|f| (f.name.clone(), f.clone()))
            .collect();
        let mut unique_fields: Vec<String> = def
            .fields
            .iter()
            .filter(|f| f.unique)
            .map(|f| f.name.clone())
            .collect();

        let mut foreign_keys = Vec::new();
        for fe in self.field_edges.iter().filter(|fe| fe.table == name) {
            let id = FieldType::Id(fe.far.clone());
            let ty = if fe.optional {
                FieldType::optional(id)
            } else {
                id
            };
            fields.insert(fe.field.clone(), FieldDef::new(fe.field.clone(), ty));
            let one_to_one = self
                .claims
                .get(&(fe.table.clone(), fe.field.clone()))
                .is_some_and(|c| c.one_to_one);
            if one_to_one {
                unique_fields.push(fe.field.clone());
            }
            foreign_keys.push(ForeignKey {
                edge: fe.edge.clone(),
                field: fe.field.clone(),
                far_table: fe.far.clone(),
                optional: fe.optional,
            });
        }

        let dependents = self
            .field_edges
            .iter()
            .filter(|fe| fe.far == name)
            .map(|fe| Dependent {
                table: fe.table.clone(),
                field: fe.field.clone(),
                optional: fe.optional,
                cascade: self
                    .claims
                    .get(&(fe.table.clone(), fe.field.clone()))
                    .map_or(EdgeDeletion::None, |c| c.cascade),
            })
            .collect();

        let mut joins: Vec<JoinMembership> = Vec::new();
        let mut edges = IndexMap::with_capacity(descriptors.len());
        for mut descriptor in descriptors {
            match &mut descriptor.kind {
                EdgeKind::Field { field, unique, .. } => {
                    *unique = unique_fields.contains(field);
                }
                EdgeKind::Join {
                    table,
                    field,
                    ref_field,
                    symmetric,
                } => {
                    let mut sides = vec![field.clone()];
                    if *symmetric {
                        sides.push(ref_field.clone());
                    }
                    for side in sides {
                        let membership = JoinMembership {
                            join_table: table.clone(),
                            field: side,
                        };
                        if !joins.contains(&membership) {
                            joins.push(membership);
                        }
                    }
                }
                EdgeKind::RefOne { .. } | EdgeKind::RefMany { .. } => {}
            }
            edges.insert(descriptor.name.clone(), Arc::new(descriptor));
        }

        let mut layout = TableLayout::new(name);
        for field in &unique_fields {
            layout.add_index(IndexDef::new(field.clone(), [field.clone()]));
        }
        for fk in &foreign_keys {
            layout.add_index(IndexDef::new(fk.field.clone(), [fk.field.clone()]));
        }
        for index in &def.indexes {
            if layout.index(&index.name).is_some() {
                return Err(invalid(format!(
                    "index `{}` on `{name}` clashes with an implicit index",
                    index.name
                )));
            }
            if index.fields.is_empty() {
                return Err(invalid(format!(
                    "index `{}` on `{name}` has no fields",
                    index.name
                )));
            }
            for field in &index.fields {
                if !fields.contains_key(field) && field != DELETION_TIME_FIELD {
                    return Err(ConfigError::UnknownField {
                        table: name.to_string(),
                        field: field.clone(),
                    });
                }
            }
            layout.add_index(IndexDef::new(index.name.clone(), index.fields.clone()));
        }

        Ok(TableMeta {
            name: name.to_string(),
            fields,
            deletion: def.deletion,
            edges,
            foreign_keys,
            dependents,
            joins,
            unique_fields,
            layout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DeletionPolicy;
    use crate::storage::CREATION_INDEX;
    use std::time::Duration;

    fn social_schema() -> Vec<EntDef> {
        vec![
            EntDef::new("users")
                .field("name", FieldType::String)
                .unique_field("email", FieldType::String)
                .edge(EdgeDecl::single("profile").ref_side())
                .edge(EdgeDecl::many("messages").soft_cascade())
                .edge(EdgeDecl::many("friends").to("users"))
                .edge(EdgeDecl::many("followees").to("users").inverse("followers"))
                .deletion(DeletionPolicy::Scheduled {
                    delay: Duration::from_secs(30),
                }),
            EntDef::new("profiles")
                .field("bio", FieldType::String)
                .edge(EdgeDecl::single("user")),
            EntDef::new("messages")
                .field("text", FieldType::String)
                .edge(EdgeDecl::single("user"))
                .edge(EdgeDecl::many("tags"))
                .deletion(DeletionPolicy::Soft),
            EntDef::new("tags")
                .unique_field("name", FieldType::String)
                .edge(EdgeDecl::many("messages")),
        ]
    }

    #[test]
    fn test_resolves_every_edge_kind() {
        let schema = resolve(social_schema()).unwrap();

        let profile = schema.edge("users", "profile").unwrap();
        assert_eq!(
            profile.kind,
            EdgeKind::RefOne {
                ref_field: "userId".into(),
                cascade: EdgeDeletion::None
            }
        );

        let user = schema.edge("profiles", "user").unwrap();
        assert_eq!(
            user.kind,
            EdgeKind::Field {
                field: "userId".into(),
                optional: false,
                unique: true
            }
        );

        let messages = schema.edge("users", "messages").unwrap();
        assert_eq!(
            messages.kind,
            EdgeKind::RefMany {
                ref_field: "userId".into(),
                cascade: EdgeDeletion::Soft
            }
        );

        // 1:many field end is not unique
        assert_eq!(
            schema.edge("messages", "user").unwrap().kind,
            EdgeKind::Field {
                field: "userId".into(),
                optional: false,
                unique: false
            }
        );

        let tags = schema.edge("messages", "tags").unwrap();
        assert_eq!(
            tags.kind,
            EdgeKind::Join {
                table: "messages_to_tags".into(),
                field: "messagesId".into(),
                ref_field: "tagsId".into(),
                symmetric: false
            }
        );
        assert_eq!(
            schema.edge("tags", "messages").unwrap().join_table(),
            Some("messages_to_tags")
        );
        assert!(schema.is_join_table("messages_to_tags"));

        let friends = schema.edge("users", "friends").unwrap();
        assert!(matches!(
            friends.kind,
            EdgeKind::Join { symmetric: true, ref table, .. } if table == "users_friends"
        ));

        let followees = schema.edge("users", "followees").unwrap();
        let followers = schema.edge("users", "followers").unwrap();
        assert_eq!(followees.join_table(), followers.join_table());
        assert!(matches!(
            &followers.kind,
            EdgeKind::Join { field, ref_field, symmetric: false, .. } if field == "bId" && ref_field == "aId"
        ));
    }

    #[test]
    fn test_dependents_joins_and_layout() {
        let schema = resolve(social_schema()).unwrap();
        let users = schema.table("users").unwrap();

        assert_eq!(users.dependents.len(), 2);
        let messages_dep = users
            .dependents
            .iter()
            .find(|d| d.table == "messages")
            .unwrap();
        assert_eq!(messages_dep.cascade, EdgeDeletion::Soft);
        assert!(!messages_dep.optional);

        // friends (both sides) + followees/followers share a table
        assert_eq!(users.joins.len(), 4);

        let profiles = schema.table("profiles").unwrap();
        assert!(profiles.is_unique("userId"));
        assert!(profiles.layout.index("userId").is_some());
        assert!(profiles.layout.index(CREATION_INDEX).is_some());
        assert_eq!(
            profiles.fields["userId"].ty,
            FieldType::Id("users".to_string())
        );

        let layouts: Vec<_> = schema.layouts().map(|l| l.name.clone()).collect();
        assert!(layouts.contains(&"users_friends".to_string()));
        assert!(layouts.contains(&"users_followees".to_string()));
        let join = schema.layouts().find(|l| l.name == "messages_to_tags").unwrap();
        assert!(join.index("messagesId_tagsId").is_some());
        assert!(join.index("tagsId_messagesId").is_some());
    }

    #[test]
    fn test_unknown_table() {
        let err = resolve(vec![EntDef::new("a").edge(EdgeDecl::single("b"))]).unwrap_err();
        assert_eq!(err, ConfigError::UnknownTable("bs".to_string()));
    }

    #[test]
    fn test_ambiguous_ref_edge() {
        let err = resolve(vec![
            EntDef::new("users").edge(EdgeDecl::many("posts")),
            EntDef::new("posts")
                .edge(EdgeDecl::single("author").to("users"))
                .edge(EdgeDecl::single("editor").to("users")),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::AmbiguousEdge { .. }));

        // Naming the field resolves it.
        let schema = resolve(vec![
            EntDef::new("users")
                .edge(EdgeDecl::many("posts").ref_field("authorId"))
                .edge(EdgeDecl::many("edits").to("posts").ref_field("editorId")),
            EntDef::new("posts")
                .edge(EdgeDecl::single("author").to("users"))
                .edge(EdgeDecl::single("editor").to("users").optional()),
        ])
        .unwrap();
        assert_eq!(schema.table("users").unwrap().dependents.len(), 2);
    }

    #[test]
    fn test_ambiguous_join_edges() {
        let err = resolve(vec![
            EntDef::new("a")
                .edge(EdgeDecl::many("bs"))
                .edge(EdgeDecl::many("others").to("bs")),
            EntDef::new("bs")
                .edge(EdgeDecl::many("as").to("a"))
                .edge(EdgeDecl::many("others").to("a")),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::AmbiguousEdge { .. }));

        let schema = resolve(vec![
            EntDef::new("a")
                .edge(EdgeDecl::many("bs").join_table("a_bs"))
                .edge(EdgeDecl::many("others").to("bs").join_table("a_others")),
            EntDef::new("bs")
                .edge(EdgeDecl::many("as").to("a").join_table("a_bs"))
                .edge(EdgeDecl::many("others").to("a").join_table("a_others")),
        ])
        .unwrap();
        assert_eq!(
            schema.edge("bs", "others").unwrap().join_table(),
            Some("a_others")
        );
    }

    #[test]
    fn test_missing_inverse() {
        let err = resolve(vec![
            EntDef::new("users").edge(EdgeDecl::single("profile").ref_side()),
            EntDef::new("profiles"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingInverse { .. }));
    }

    #[test]
    fn test_both_ends_optional() {
        let err = resolve(vec![
            EntDef::new("users").edge(EdgeDecl::single("profile").ref_side()),
            EntDef::new("profiles").edge(EdgeDecl::single("user").optional()),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::BothEndsOptional { .. }));
    }

    #[test]
    fn test_soft_cascade_into_hard_table() {
        let err = resolve(vec![
            EntDef::new("users").edge(EdgeDecl::many("posts").soft_cascade()),
            EntDef::new("posts").edge(EdgeDecl::single("user")),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::SoftCascadeIntoHardTable { .. }));
    }

    #[test]
    fn test_duplicate_names() {
        let err = resolve(vec![EntDef::new("a"), EntDef::new("a")]).unwrap_err();
        assert_eq!(err, ConfigError::DuplicateTable("a".into()));

        let err = resolve(vec![
            EntDef::new("users")
                .edge(EdgeDecl::many("followees").to("users").inverse("followers"))
                .edge(EdgeDecl::many("followers").to("users")),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateEdge { .. }));
    }

    #[test]
    fn test_index_on_unknown_field() {
        let err = resolve(vec![
            EntDef::new("users")
                .field("name", FieldType::String)
                .index("by_age", ["age"]),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::UnknownField {
                table: "users".into(),
                field: "age".into()
            }
        );
    }
}
