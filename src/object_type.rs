//! # Object Type Registry
//!
//! Canonical identifiers for every exportable configuration object class,
//! plus the data that drives the rest of the pipeline: request-token
//! normalization, per-type capability sets, table names, and declared
//! relations (which determine prefetch coverage for the relation cache).
//!
//! Adding a type is a data change: extend the enum, the `CANONICAL_TYPES`
//! table, and the `relations`/`supports` tables below.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ExportError, Result};

/// Canonical identifier for a class of configuration object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectType {
    Host,
    Service,
    Command,
    CommandArgument,
    Notification,
    TimePeriod,
    User,
    ApiUser,
    Zone,
    Endpoint,
    HostGroup,
    ServiceGroup,
    UserGroup,
}

/// Feature tags queried by membership test instead of dynamically-named
/// method dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    Templates,
    Groups,
    CustomVars,
    ApplyRules,
    Sets,
}

/// Lookup table from normalized singular token to canonical type.
const CANONICAL_TYPES: &[(&str, ObjectType)] = &[
    ("host", ObjectType::Host),
    ("service", ObjectType::Service),
    ("command", ObjectType::Command),
    ("commandargument", ObjectType::CommandArgument),
    ("notification", ObjectType::Notification),
    ("timeperiod", ObjectType::TimePeriod),
    ("user", ObjectType::User),
    ("apiuser", ObjectType::ApiUser),
    ("zone", ObjectType::Zone),
    ("endpoint", ObjectType::Endpoint),
    ("hostgroup", ObjectType::HostGroup),
    ("servicegroup", ObjectType::ServiceGroup),
    ("usergroup", ObjectType::UserGroup),
];

/// Irregular suffixes that keep canonical casing when rendering type names.
const IRREGULAR_SUFFIXES: &[(&str, &str)] = &[
    ("group", "Group"),
    ("period", "Period"),
    ("argument", "Argument"),
    ("apiuser", "ApiUser"),
];

/// A foreign-key column on the object's table pointing at a related type.
///
/// `property` is the name the reference is exported under: the referenced
/// object's name replaces the numeric id in the output tree.
#[derive(Debug, Clone, Copy)]
pub struct RelationSpec {
    pub column: &'static str,
    pub property: &'static str,
    pub target: ObjectType,
}

const fn rel(
    column: &'static str,
    property: &'static str,
    target: ObjectType,
) -> RelationSpec {
    RelationSpec {
        column,
        property,
        target,
    }
}

impl ObjectType {
    /// Normalize a pluralized, possibly template-infixed request token.
    ///
    /// Rules (deterministic and total over the supported token set): lowercase,
    /// strip one trailing `s`, strip a `template` infix. `hosttemplates` and
    /// `hosts` both select [`ObjectType::Host`]; anything unrecognized is an
    /// [`ExportError::UnsupportedType`], a configuration error raised before
    /// any I/O happens.
    pub fn from_request_token(token: &str) -> Result<Self> {
        let lowered = token.to_ascii_lowercase();
        let singular = lowered.strip_suffix('s').unwrap_or(&lowered);
        let normalized = singular.replace("template", "");

        CANONICAL_TYPES
            .iter()
            .find(|(name, _)| *name == normalized)
            .map(|(_, ty)| *ty)
            .ok_or_else(|| ExportError::UnsupportedType(token.to_string()))
    }

    /// Singular lowercase token, the inverse of [`Self::from_request_token`].
    pub fn token(self) -> &'static str {
        CANONICAL_TYPES
            .iter()
            .find(|(_, ty)| *ty == self)
            .map(|(name, _)| *name)
            .expect("every variant is listed in CANONICAL_TYPES")
    }

    /// Pluralized token as used in request paths and permission names.
    pub fn plural_token(self) -> String {
        format!("{}s", self.token())
    }

    /// Group types collapse onto their base type for tab/permission purposes.
    pub fn base_type(self) -> ObjectType {
        match self {
            ObjectType::HostGroup => ObjectType::Host,
            ObjectType::ServiceGroup => ObjectType::Service,
            ObjectType::UserGroup => ObjectType::User,
            other => other,
        }
    }

    /// Backing table for this type.
    pub fn table_name(self) -> &'static str {
        match self {
            ObjectType::Host => "steward_host",
            ObjectType::Service => "steward_service",
            ObjectType::Command => "steward_command",
            ObjectType::CommandArgument => "steward_command_argument",
            ObjectType::Notification => "steward_notification",
            ObjectType::TimePeriod => "steward_timeperiod",
            ObjectType::User => "steward_user",
            ObjectType::ApiUser => "steward_apiuser",
            ObjectType::Zone => "steward_zone",
            ObjectType::Endpoint => "steward_endpoint",
            ObjectType::HostGroup => "steward_hostgroup",
            ObjectType::ServiceGroup => "steward_servicegroup",
            ObjectType::UserGroup => "steward_usergroup",
        }
    }

    /// Static capability set, replacing `supports<Feature>()` dispatch.
    pub fn supports(self, feature: Feature) -> bool {
        use Feature::*;
        use ObjectType::*;

        let features: &[Feature] = match self {
            Host => &[Templates, Groups, CustomVars],
            Service => &[Templates, Groups, CustomVars, ApplyRules, Sets],
            Command => &[Templates, CustomVars],
            CommandArgument => &[],
            Notification => &[Templates, CustomVars, ApplyRules],
            TimePeriod => &[Templates],
            User => &[Templates, Groups, CustomVars],
            ApiUser => &[],
            Zone => &[],
            Endpoint => &[],
            HostGroup | ServiceGroup | UserGroup => &[],
        };
        features.contains(&feature)
    }

    /// Error when `feature` is not in this type's capability set.
    pub fn require_support(self, feature: Feature) -> Result<()> {
        if self.supports(feature) {
            Ok(())
        } else {
            Err(ExportError::UnsupportedFeature {
                object_type: self,
                feature,
            })
        }
    }

    /// Group type whose members this type's `groups` column names.
    pub fn group_type(self) -> Option<ObjectType> {
        match self {
            ObjectType::Host => Some(ObjectType::HostGroup),
            ObjectType::Service => Some(ObjectType::ServiceGroup),
            ObjectType::User => Some(ObjectType::UserGroup),
            _ => None,
        }
    }

    /// Foreign-key relations declared on this type's table.
    pub fn relations(self) -> &'static [RelationSpec] {
        use ObjectType::*;
        match self {
            Host => const {
                &[
                    rel("check_command_id", "check_command", Command),
                    rel("event_command_id", "event_command", Command),
                    rel("check_period_id", "check_period", TimePeriod),
                    rel("command_endpoint_id", "command_endpoint", Endpoint),
                    rel("zone_id", "zone", Zone),
                ]
            },
            Service => const {
                &[
                    rel("host_id", "host", Host),
                    rel("check_command_id", "check_command", Command),
                    rel("event_command_id", "event_command", Command),
                    rel("check_period_id", "check_period", TimePeriod),
                    rel("zone_id", "zone", Zone),
                ]
            },
            Command => const { &[rel("zone_id", "zone", Zone)] },
            CommandArgument => const { &[rel("command_id", "command", Command)] },
            Notification => const {
                &[
                    rel("host_id", "host", Host),
                    rel("command_id", "command", Command),
                    rel("period_id", "period", TimePeriod),
                    rel("zone_id", "zone", Zone),
                ]
            },
            TimePeriod => const { &[rel("zone_id", "zone", Zone)] },
            User => const {
                &[
                    rel("period_id", "period", TimePeriod),
                    rel("zone_id", "zone", Zone),
                ]
            },
            ApiUser => &[],
            Zone => const { &[rel("parent_id", "parent", Zone)] },
            Endpoint => const { &[rel("zone_id", "zone", Zone)] },
            HostGroup | ServiceGroup | UserGroup => &[],
        }
    }

    /// Every related type the relation cache must prefetch before resolution
    /// may begin: foreign-key targets, the type itself when it has templates,
    /// and its group type when it has groups. Deduplicated, order stable.
    pub fn related_types(self) -> Vec<ObjectType> {
        let mut types = Vec::new();
        let mut push = |ty: ObjectType| {
            if !types.contains(&ty) {
                types.push(ty);
            }
        };

        if self.supports(Feature::Templates) {
            push(self);
        }
        for spec in self.relations() {
            push(spec.target);
        }
        if let Some(group) = self.group_type() {
            push(group);
        }
        types
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Canonical casing: capitalize, then restore irregular suffixes.
        let token = self.token();
        let mut name: String = token
            .char_indices()
            .map(|(i, c)| if i == 0 { c.to_ascii_uppercase() } else { c })
            .collect();
        for (suffix, canonical) in IRREGULAR_SUFFIXES {
            if token.ends_with(suffix) {
                let cut = name.len() - suffix.len();
                name.truncate(cut);
                name.push_str(canonical);
                break;
            }
        }
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plural_token_normalization() {
        assert_eq!(
            ObjectType::from_request_token("hosts").unwrap(),
            ObjectType::Host
        );
        assert_eq!(
            ObjectType::from_request_token("services").unwrap(),
            ObjectType::Service
        );
        assert_eq!(
            ObjectType::from_request_token("commands").unwrap(),
            ObjectType::Command
        );
    }

    #[test]
    fn test_template_infix_is_stripped() {
        assert_eq!(
            ObjectType::from_request_token("hosttemplates").unwrap(),
            ObjectType::Host
        );
        assert_eq!(
            ObjectType::from_request_token("servicetemplates").unwrap(),
            ObjectType::Service
        );
    }

    #[test]
    fn test_irregular_suffixes() {
        assert_eq!(
            ObjectType::from_request_token("hostgroups").unwrap(),
            ObjectType::HostGroup
        );
        assert_eq!(
            ObjectType::from_request_token("timeperiods").unwrap(),
            ObjectType::TimePeriod
        );
        assert_eq!(
            ObjectType::from_request_token("commandarguments").unwrap(),
            ObjectType::CommandArgument
        );
        assert_eq!(
            ObjectType::from_request_token("apiusers").unwrap(),
            ObjectType::ApiUser
        );
    }

    #[test]
    fn test_unsupported_token_is_rejected() {
        let err = ObjectType::from_request_token("widgets").unwrap_err();
        assert!(matches!(
            err,
            crate::error::ExportError::UnsupportedType(_)
        ));
    }

    #[test]
    fn test_normalization_is_deterministic() {
        for _ in 0..3 {
            assert_eq!(
                ObjectType::from_request_token("HostGroups").unwrap(),
                ObjectType::HostGroup
            );
        }
    }

    #[test]
    fn test_display_casing() {
        assert_eq!(ObjectType::Host.to_string(), "Host");
        assert_eq!(ObjectType::HostGroup.to_string(), "HostGroup");
        assert_eq!(ObjectType::TimePeriod.to_string(), "TimePeriod");
        assert_eq!(ObjectType::ApiUser.to_string(), "ApiUser");
    }

    #[test]
    fn test_base_type_collapses_groups() {
        assert_eq!(ObjectType::HostGroup.base_type(), ObjectType::Host);
        assert_eq!(ObjectType::Service.base_type(), ObjectType::Service);
    }

    #[test]
    fn test_capability_sets() {
        assert!(ObjectType::Service.supports(Feature::ApplyRules));
        assert!(ObjectType::Service.supports(Feature::Sets));
        assert!(!ObjectType::Host.supports(Feature::ApplyRules));
        assert!(!ObjectType::ApiUser.supports(Feature::Templates));
        assert!(ObjectType::Host.require_support(Feature::Groups).is_ok());
        assert!(ObjectType::Zone.require_support(Feature::Sets).is_err());
    }

    #[test]
    fn test_related_types_cover_relations_and_groups() {
        let related = ObjectType::Host.related_types();
        assert!(related.contains(&ObjectType::Host)); // own templates
        assert!(related.contains(&ObjectType::Command));
        assert!(related.contains(&ObjectType::TimePeriod));
        assert!(related.contains(&ObjectType::Zone));
        assert!(related.contains(&ObjectType::HostGroup));

        // No duplicates even though two relations target Command.
        let commands = related
            .iter()
            .filter(|t| **t == ObjectType::Command)
            .count();
        assert_eq!(commands, 1);
    }
}
