//! Property-based tests for collection request parsing.
//!
//! These tests use proptest to generate specifiers and verify that the
//! resolver and its helpers hold their invariants for all of them.

#[cfg(test)]
mod proptest_tests {
    use crate::request::{derive_collection_name, resolve, split_groups, RequestKind, ResolveContext};
    use proptest::prelude::*;

    fn missing_cwd() -> ResolveContext {
        ResolveContext::new("/nonexistent-ade-proptest-dir")
    }

    proptest! {
        /// Property: any `namespace.name` resolves to that registry identity
        #[test]
        fn registry_names_resolve_to_identity(
            ns in "[a-z][a-z0-9]{0,10}",
            name in "[a-z][a-z0-9]{0,10}",
        ) {
            let text = format!("{}.{}", ns, name);
            let request = resolve(&text, &missing_cwd()).unwrap();
            prop_assert_eq!(request.kind(), RequestKind::RegistryName);
            prop_assert_eq!(request.namespace(), ns.as_str());
            prop_assert_eq!(request.name(), name.as_str());
            prop_assert_eq!(request.version_specifier(), None);
            prop_assert_eq!(request.install_target(), text.as_str());
        }

        /// Property: a version suffix is kept verbatim as the specifier
        #[test]
        fn registry_specifier_is_verbatim(
            ns in "[a-z]{1,8}",
            name in "[a-z]{1,8}",
            version in ":(>=|==|<)?[0-9]{1,2}\\.[0-9]{1,2}\\.[0-9]{1,2}",
        ) {
            let text = format!("{}.{}{}", ns, name, version);
            let request = resolve(&text, &missing_cwd()).unwrap();
            prop_assert_eq!(request.version_specifier(), Some(version.as_str()));
        }

        /// Property: split_groups never loses the base text
        #[test]
        fn split_groups_preserves_prefix(base in "[a-z./]{1,20}", groups in prop::collection::vec("[a-z]{1,6}", 0..4)) {
            let text = if groups.is_empty() {
                base.clone()
            } else {
                format!("{}[{}]", base, groups.join(","))
            };
            let (split_base, split) = split_groups(&text);
            prop_assert_eq!(split_base, base.as_str());
            prop_assert_eq!(split, groups);
        }

        /// Property: derived collection names only contain identifier characters
        #[test]
        fn derived_names_are_identifiers(owner in "[A-Za-z0-9._-]{1,12}", repo in "[A-Za-z0-9._-]{1,12}") {
            let url = format!("git+https://github.com/{}/{}.git", owner, repo);
            let (ns, name) = derive_collection_name(&url);
            for part in [&ns, &name] {
                prop_assert!(!part.is_empty());
                prop_assert!(
                    part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'),
                    "unexpected character in {:?} derived from {}",
                    part,
                    url
                );
            }
        }
    }
}
