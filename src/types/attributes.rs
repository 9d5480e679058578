//! Duck typing annotations carried by shape and target members.
use std::ops::{BitOr, BitOrAssign};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BindingFlags(u8);

impl BindingFlags {
    pub const INSTANCE: BindingFlags = BindingFlags(0b0001);
    pub const STATIC: BindingFlags = BindingFlags(0b0010);
    pub const PUBLIC: BindingFlags = BindingFlags(0b0100);
    pub const NON_PUBLIC: BindingFlags = BindingFlags(0b1000);
    /// Every member regardless of visibility or ownership.
    pub const DEFAULT: BindingFlags = BindingFlags(0b1111);

    pub const fn empty() -> Self {
        BindingFlags(0)
    }

    pub const fn contains(self, other: BindingFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether a member with the given static-ness and visibility passes this filter.
    pub fn admits(self, is_static: bool, is_public: bool) -> bool {
        let ownership = if is_static {
            BindingFlags::STATIC
        } else {
            BindingFlags::INSTANCE
        };
        let visibility = if is_public {
            BindingFlags::PUBLIC
        } else {
            BindingFlags::NON_PUBLIC
        };
        self.contains(ownership) && self.contains(visibility)
    }
}

impl Default for BindingFlags {
    fn default() -> Self {
        BindingFlags::DEFAULT
    }
}

impl BitOr for BindingFlags {
    type Output = BindingFlags;

    fn bitor(self, rhs: Self) -> Self::Output {
        BindingFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for BindingFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Whether a shape property binds to a target property or a target field.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DuckKind {
    #[default]
    Property,
    Field,
}

/// Explicit mapping of a shape member onto its target.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DuckAttribute {
    /// Target member name; a comma separated list is tried in order.
    pub name: Option<String>,
    pub kind: DuckKind,
    pub binding_flags: BindingFlags,
    pub parameter_type_names: Option<Vec<String>>,
    pub generic_parameter_type_names: Option<Vec<String>>,
}

impl DuckAttribute {
    pub fn named(name: impl Into<String>) -> Self {
        DuckAttribute {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn field(mut self) -> Self {
        self.kind = DuckKind::Field;
        self
    }

    pub fn flags(mut self, flags: BindingFlags) -> Self {
        self.binding_flags = flags;
        self
    }

    pub fn parameter_types<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parameter_type_names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn generic_arguments<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.generic_parameter_type_names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Candidate target names, falling back to the shape member's own name.
    pub fn candidate_names(&self, member_name: &str) -> Vec<String> {
        match &self.name {
            Some(names) => names
                .split(',')
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string)
                .collect(),
            None => vec![member_name.to_string()],
        }
    }
}

/// Annotations on a single member.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MemberAttributes {
    pub duck: Option<DuckAttribute>,
    pub ignore: bool,
    pub include: bool,
    /// Marks a target method as matching shape methods by argument type name.
    pub reverse_arguments: Option<Vec<String>>,
}

impl MemberAttributes {
    /// The member's duck mapping, or the implicit by-name mapping.
    pub fn duck_or_default(&self) -> DuckAttribute {
        self.duck.clone().unwrap_or_default()
    }
}

/// Annotations on a type.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TypeAttributes {
    /// The struct is a data-copy shape.
    pub duck_copy: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binding_flags_filter_members() {
        let public_instance = BindingFlags::PUBLIC | BindingFlags::INSTANCE;
        assert!(public_instance.admits(false, true));
        assert!(!public_instance.admits(true, true));
        assert!(!public_instance.admits(false, false));
        assert!(BindingFlags::DEFAULT.admits(true, false));
        assert!(!BindingFlags::empty().admits(false, true));
    }

    #[test]
    fn candidate_names_split_on_commas() {
        let duck = DuckAttribute::named("Value, _value ,");
        assert_eq!(duck.candidate_names("Ignored"), vec!["Value", "_value"]);
        assert_eq!(DuckAttribute::default().candidate_names("Count"), vec!["Count"]);
    }
}
