//! Composable entity predicates that carry their own description.
//!
//! The description doubles as violation prose: a failed `name_should` rule
//! reports `name <X> should <description>`.

use std::fmt;
use std::sync::Arc;

use crate::model::Entity;
use crate::pattern::{self, PatternError};

pub struct Matcher<T> {
    description: String,
    predicate: Arc<dyn Fn(&T) -> bool + Send + Sync>,
}

impl<T> Clone for Matcher<T> {
    fn clone(&self) -> Self {
        Self {
            description: self.description.clone(),
            predicate: Arc::clone(&self.predicate),
        }
    }
}

impl<T> fmt::Debug for Matcher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Matcher")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl<T> Matcher<T> {
    pub fn new(
        description: impl Into<String>,
        predicate: impl Fn(&T) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            description: description.into(),
            predicate: Arc::new(predicate),
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn matches(&self, item: &T) -> bool {
        (self.predicate)(item)
    }

    /// Verdict together with the description.
    pub fn evaluate(&self, item: &T) -> (bool, String) {
        (self.matches(item), self.description.clone())
    }
}

impl<T: 'static> Matcher<T> {
    /// Conjunction. Stops at the first miss.
    pub fn all_of(matchers: Vec<Matcher<T>>) -> Self {
        let description = join(&matchers, " and ");
        Self::new(description, move |item| matchers.iter().all(|m| m.matches(item)))
    }

    /// Disjunction. Stops at the first hit.
    pub fn any_of(matchers: Vec<Matcher<T>>) -> Self {
        let description = join(&matchers, " or ");
        Self::new(description, move |item| matchers.iter().any(|m| m.matches(item)))
    }

    pub fn not(matcher: Matcher<T>) -> Self {
        let description = format!("not {}", matcher.description);
        Self::new(description, move |item| !matcher.matches(item))
    }
}

impl<T: 'static> std::ops::Not for Matcher<T> {
    type Output = Matcher<T>;

    fn not(self) -> Self::Output {
        Matcher::not(self)
    }
}

impl<T: Entity + 'static> Matcher<T> {
    /// Exact name equality.
    pub fn with_name(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(format!("be named \"{name}\""), move |item: &T| {
            item.name() == name
        })
    }

    pub fn have_prefix(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        Self::new(format!("have prefix \"{prefix}\""), move |item: &T| {
            item.name().starts_with(prefix.as_str())
        })
    }

    pub fn have_suffix(suffix: impl Into<String>) -> Self {
        let suffix = suffix.into();
        Self::new(format!("have suffix \"{suffix}\""), move |item: &T| {
            item.name().ends_with(suffix.as_str())
        })
    }

    /// Package path matches a filesystem-style glob.
    pub fn in_package(glob: &str) -> Result<Self, PatternError> {
        let matcher = pattern::package_glob(glob)?;
        Ok(Self::new(
            format!("reside in package \"{glob}\""),
            move |item: &T| matcher.is_match(item.package_id()),
        ))
    }

    pub fn is_exported() -> Self {
        Self::new("be exported", |item: &T| pattern::is_exported(item.name()))
    }
}

fn join<T>(matchers: &[Matcher<T>], separator: &str) -> String {
    matchers
        .iter()
        .map(|m| m.description.as_str())
        .collect::<Vec<_>>()
        .join(separator)
}

/// True when `item` satisfies every matcher. An empty set matches everything.
pub fn matches_all<T>(matchers: &[Matcher<T>], item: &T) -> bool {
    matchers.iter().all(|m| m.matches(item))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::File;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn file(name: &str) -> File {
        File::new(format!("/src/app/{name}"), "example.com/app/service", false)
    }

    #[test]
    fn test_basic_matchers() {
        let f = file("user_service.go");
        assert!(Matcher::<File>::with_name("user_service.go").matches(&f));
        assert!(Matcher::<File>::have_prefix("user").matches(&f));
        assert!(Matcher::<File>::have_suffix("_service.go").matches(&f));
        assert!(!Matcher::<File>::have_suffix("_test.go").matches(&f));
        assert_eq!(
            Matcher::<File>::have_suffix("Impl").description(),
            "have suffix \"Impl\""
        );
    }

    #[test]
    fn test_all_of_short_circuits_on_miss() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = {
            let calls = Arc::clone(&calls);
            Matcher::new("be counted", move |_: &File| {
                calls.fetch_add(1, Ordering::SeqCst);
                true
            })
        };
        let m = Matcher::all_of(vec![Matcher::have_prefix("order"), counted]);
        assert!(!m.matches(&file("user.go")));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(m.description(), "have prefix \"order\" and be counted");
    }

    #[test]
    fn test_any_of_short_circuits_on_hit() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = {
            let calls = Arc::clone(&calls);
            Matcher::new("be counted", move |_: &File| {
                calls.fetch_add(1, Ordering::SeqCst);
                false
            })
        };
        let m = Matcher::any_of(vec![Matcher::have_prefix("user"), counted]);
        let (hit, description) = m.evaluate(&file("user.go"));
        assert!(hit);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(description, "have prefix \"user\" or be counted");
    }

    #[test]
    fn test_negation() {
        let m = !Matcher::<File>::have_suffix("_test.go");
        assert!(m.matches(&file("user.go")));
        assert_eq!(m.description(), "not have suffix \"_test.go\"");
        assert!(!Matcher::not(Matcher::<File>::with_name("a.go")).matches(&file("a.go")));
    }

    #[test]
    fn test_in_package_and_exported() {
        let m = Matcher::<File>::in_package("**/service").unwrap();
        assert!(m.matches(&file("a.go")));
        assert!(Matcher::<File>::in_package("a/[").is_err());
        assert!(!Matcher::<File>::is_exported().matches(&file("a.go")));
        assert!(Matcher::<File>::is_exported().matches(&file("Api.go")));
    }

    #[test]
    fn test_empty_set_matches_everything() {
        assert!(matches_all::<File>(&[], &file("x.go")));
        let set = [Matcher::have_prefix("x"), Matcher::have_suffix(".go")];
        assert!(matches_all(&set, &file("x.go")));
        assert!(!matches_all(&set, &file("y.go")));
    }
}
