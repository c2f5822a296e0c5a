//! Numeric kind constants for the group-management and view-event ranges (§4.1).

use nostr::Kind;

pub const KIND_GROUP_ADD_USER_9000: Kind = Kind::Custom(9000);
pub const KIND_GROUP_REMOVE_USER_9001: Kind = Kind::Custom(9001);
pub const KIND_GROUP_EDIT_METADATA_9002: Kind = Kind::Custom(9002);
pub const KIND_GROUP_DELETE_EVENT_9005: Kind = Kind::Custom(9005);
pub const KIND_GROUP_SET_ROLES_9006: Kind = Kind::Custom(9006);
pub const KIND_GROUP_CREATE_9007: Kind = Kind::Custom(9007);
pub const KIND_GROUP_DELETE_9008: Kind = Kind::Custom(9008);
pub const KIND_GROUP_CREATE_INVITE_9009: Kind = Kind::Custom(9009);
pub const KIND_GROUP_USER_JOIN_REQUEST_9021: Kind = Kind::Custom(9021);
pub const KIND_GROUP_USER_LEAVE_REQUEST_9022: Kind = Kind::Custom(9022);

pub const KIND_GROUP_METADATA_39000: Kind = Kind::Custom(39000);
pub const KIND_GROUP_ADMINS_39001: Kind = Kind::Custom(39001);
pub const KIND_GROUP_MEMBERS_39002: Kind = Kind::Custom(39002);
pub const KIND_GROUP_ROLES_39003: Kind = Kind::Custom(39003);

/// Kinds the Action Codec decodes into moderation [`crate::action::Action`]s.
pub const MODERATION_KINDS: &[Kind] = &[
    KIND_GROUP_CREATE_9007,
    KIND_GROUP_DELETE_9008,
    KIND_GROUP_ADD_USER_9000,
    KIND_GROUP_REMOVE_USER_9001,
    KIND_GROUP_EDIT_METADATA_9002,
    KIND_GROUP_DELETE_EVENT_9005,
    KIND_GROUP_SET_ROLES_9006,
];

/// The four synthesized, relay-signed replaceable view kinds (§4.6).
pub const METADATA_VIEW_KINDS: &[Kind] = &[
    KIND_GROUP_METADATA_39000,
    KIND_GROUP_ADMINS_39001,
    KIND_GROUP_MEMBERS_39002,
    KIND_GROUP_ROLES_39003,
];

pub fn is_metadata_view_kind(kind: &Kind) -> bool {
    METADATA_VIEW_KINDS.contains(kind)
}

pub fn is_moderation_kind(kind: &Kind) -> bool {
    MODERATION_KINDS.contains(kind)
}
