use serde::{Deserialize, Serialize};
use std::fmt;

/// Category a violation is reported under.
///
/// Variants are declared in lexicographic order so that the derived `Ord`
/// gives the report its stable section order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    Context,
    File,
    Folder,
    Function,
    Layer,
    Location,
    Naming,
    Package,
    Type,
    UnusedPublic,
    Variable,
}

impl Category {
    pub const ALL: [Category; 11] = [
        Category::Context,
        Category::File,
        Category::Folder,
        Category::Function,
        Category::Layer,
        Category::Location,
        Category::Naming,
        Category::Package,
        Category::Type,
        Category::UnusedPublic,
        Category::Variable,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Context => "Context",
            Category::File => "File",
            Category::Folder => "Folder",
            Category::Function => "Function",
            Category::Layer => "Layer",
            Category::Location => "Location",
            Category::Naming => "Naming",
            Category::Package => "Package",
            Category::Type => "Type",
            Category::UnusedPublic => "UnusedPublic",
            Category::Variable => "Variable",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| anyhow::anyhow!("unknown category: {s}"))
    }
}

/// Location of a declaration or use inside a source file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: std::path::PathBuf,
    pub line: usize,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file.display(), self.line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_order_is_lexicographic() {
        let mut names: Vec<&str> = Category::ALL.iter().map(|c| c.as_str()).collect();
        let declared = names.clone();
        names.sort();
        assert_eq!(names, declared);

        let mut sorted = Category::ALL.to_vec();
        sorted.sort();
        assert_eq!(sorted, Category::ALL.to_vec());
    }

    #[test]
    fn test_category_parse() {
        assert_eq!("naming".parse::<Category>().unwrap(), Category::Naming);
        assert_eq!(
            "UnusedPublic".parse::<Category>().unwrap(),
            Category::UnusedPublic
        );
        assert!("unknown".parse::<Category>().is_err());
    }

    #[test]
    fn test_source_location_display() {
        let loc = SourceLocation {
            file: "pkg/a.go".into(),
            line: 12,
        };
        assert_eq!(loc.to_string(), "pkg/a.go:12");
    }
}
