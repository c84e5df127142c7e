/// Resources exposed by the admin backend and name resolution for them

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
  /// Path segment of the collection endpoint
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
}

/// All known resources
pub const RESOURCES: &[Resource] = &[
  Resource {
    name: "skills",
    aliases: &["sk", "skill"],
    description: "Skills of the competency taxonomy",
  },
  Resource {
    name: "levels",
    aliases: &["lv", "level"],
    description: "Proficiency levels",
  },
  Resource {
    name: "careers",
    aliases: &["ca", "career"],
    description: "Career paths",
  },
  Resource {
    name: "categories",
    aliases: &["cat", "category"],
    description: "Skill categories",
  },
  Resource {
    name: "roles",
    aliases: &["ro", "role"],
    description: "Access control roles",
  },
  Resource {
    name: "permissions",
    aliases: &["pe", "perm", "permission"],
    description: "Permissions granted to roles",
  },
  Resource {
    name: "users",
    aliases: &["u", "user"],
    description: "Console users",
  },
];

/// How well an input matches a resource; earlier variants rank higher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchKind {
  Name,
  Alias,
  NamePrefix,
  AliasPrefix,
  Contains,
}

impl MatchKind {
  /// Exact hits identify a resource on their own.
  pub fn is_exact(self) -> bool {
    matches!(self, MatchKind::Name | MatchKind::Alias)
  }
}

impl Resource {
  /// Best way `input` (lowercased, trimmed) refers to this resource.
  pub fn matches(&self, input: &str) -> Option<MatchKind> {
    let aliases = || self.aliases.iter();
    if self.name == input {
      Some(MatchKind::Name)
    } else if aliases().any(|a| *a == input) {
      Some(MatchKind::Alias)
    } else if self.name.starts_with(input) {
      Some(MatchKind::NamePrefix)
    } else if aliases().any(|a| a.starts_with(input)) {
      Some(MatchKind::AliasPrefix)
    } else if self.name.contains(input) {
      Some(MatchKind::Contains)
    } else {
      None
    }
  }
}

/// Resources matching `input` with how they matched, best first. Catalog
/// order breaks ties.
fn ranked(input: &str) -> Vec<(&'static Resource, MatchKind)> {
  let input = input.trim().to_lowercase();
  let mut ranked: Vec<_> = RESOURCES
    .iter()
    .filter_map(|res| res.matches(&input).map(|kind| (res, kind)))
    .collect();
  ranked.sort_by_key(|(_, kind)| *kind);
  ranked
}

/// Suggestions for a partially typed resource name, best match first. An
/// empty input suggests the whole catalog.
pub fn get_suggestions(input: &str) -> Vec<&'static Resource> {
  if input.trim().is_empty() {
    return RESOURCES.iter().collect();
  }
  ranked(input).into_iter().map(|(res, _)| res).collect()
}

/// Resolve user input to a resource name.
///
/// An exact name or alias wins, as does an input with a single candidate.
/// Anything else that looks like a path segment is passed through as is,
/// so resources missing from the catalog stay reachable.
pub fn resolve(input: &str) -> Option<String> {
  let input = input.trim();
  if input.is_empty() {
    return None;
  }

  match ranked(input).as_slice() {
    [(res, kind), ..] if kind.is_exact() => return Some(res.name.to_string()),
    [(res, _)] => return Some(res.name.to_string()),
    _ => {}
  }

  input
    .chars()
    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    .then(|| input.to_string())
}
