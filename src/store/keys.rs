//! Type-qualified key namespace.
//!
//! Objects and lists of objects are stored as JSON strings under keys that
//! encode their shape, so a single `User` and a `Vec<User>` saved under the
//! same base key never overwrite each other:
//!
//! - object: `pref_obj_<key>`
//! - list:   `pref_list_obj_<element type name><key>`

use crate::constants::{PREFIX_LIST, PREFIX_OBJECT};

/// Storage key for a single serialized object.
pub fn object_key(key: &str) -> String {
    format!("{PREFIX_OBJECT}{key}")
}

/// Storage key for a serialized list whose elements are `T`.
///
/// The element name comes from [`std::any::type_name`], which is stable for
/// a given compiler but not guaranteed across compiler releases.
pub fn list_key<T: ?Sized>(key: &str) -> String {
    format!("{PREFIX_LIST}{}{key}", std::any::type_name::<T>())
}

/// Shape encoded in a storage key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyShape {
    Scalar,
    Object,
    List,
}

/// Classifies a storage key by its prefix.
pub fn shape_of(storage_key: &str) -> KeyShape {
    if storage_key.starts_with(PREFIX_LIST) {
        KeyShape::List
    } else if storage_key.starts_with(PREFIX_OBJECT) {
        KeyShape::Object
    } else {
        KeyShape::Scalar
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    struct User;

    #[test]
    fn test_object_and_list_keys_do_not_collide() {
        let obj = object_key("users");
        let list = list_key::<User>("users");
        assert_ne!(obj, list);
        assert_eq!(obj, "pref_obj_users");
        assert!(list.starts_with("pref_list_obj_"));
        assert!(list.ends_with("Userusers"));
    }

    #[test]
    fn test_list_keys_differ_by_element_type() {
        assert_ne!(list_key::<User>("k"), list_key::<String>("k"));
    }

    #[test]
    fn test_shape_of() {
        assert_eq!(shape_of("name"), KeyShape::Scalar);
        assert_eq!(shape_of(&object_key("u")), KeyShape::Object);
        assert_eq!(shape_of(&list_key::<User>("u")), KeyShape::List);
    }
}
