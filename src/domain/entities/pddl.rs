//! PDDL artifacts - opaque planner inputs with minimal structural checks
//!
//! Content is deliberately not parsed beyond the header and parenthesis
//! balance; syntactic and semantic validation is the external planner's job.

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// A PDDL domain: the action/predicate vocabulary of the quest world
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PddlDomain {
    pub name: String,
    pub content: String,
}

impl PddlDomain {
    /// Wrap generated domain text, checking it parenthesis-balances and
    /// carries a `(define` header
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Result<Self, DomainError> {
        let name = name.into();
        let content = content.into();
        check_structure("domain", &name, &content)?;
        Ok(Self { name, content })
    }

    /// Wrap persisted domain text, reading the name from the `(domain X)`
    /// header ("unknown" when absent)
    pub fn parse(content: impl Into<String>) -> Result<Self, DomainError> {
        let content = content.into();
        let name = header_symbol(&content, "(domain").unwrap_or_else(|| "unknown".to_string());
        check_structure("domain", &name, &content)?;
        Ok(Self { name, content })
    }
}

/// A PDDL problem: objects, initial state, and goal, tied to a domain by name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PddlProblem {
    pub name: String,
    /// Name of the domain this problem was written against. Must match the
    /// paired `PddlDomain::name` before the planner is invoked.
    pub domain_name: String,
    pub content: String,
}

impl PddlProblem {
    pub fn new(
        name: impl Into<String>,
        domain_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let name = name.into();
        let content = content.into();
        check_structure("problem", &name, &content)?;
        Ok(Self {
            name,
            domain_name: domain_name.into(),
            content,
        })
    }

    /// Wrap persisted problem text, reading the problem and domain names
    /// from the `(problem X)` / `(:domain Y)` headers
    pub fn parse(content: impl Into<String>) -> Result<Self, DomainError> {
        let content = content.into();
        let name = header_symbol(&content, "(problem").unwrap_or_else(|| "unknown".to_string());
        let domain_name =
            header_symbol(&content, ":domain").unwrap_or_else(|| "unknown".to_string());
        check_structure("problem", &name, &content)?;
        Ok(Self {
            name,
            domain_name,
            content,
        })
    }

    /// Check this problem references the given domain
    pub fn check_domain(&self, domain: &PddlDomain) -> Result<(), DomainError> {
        if self.domain_name != domain.name {
            return Err(DomainError::DomainMismatch {
                problem: self.name.clone(),
                expected: domain.name.clone(),
                found: self.domain_name.clone(),
            });
        }
        Ok(())
    }
}

fn check_structure(
    artifact: &'static str,
    name: &str,
    content: &str,
) -> Result<(), DomainError> {
    if !content.contains("(define") {
        return Err(DomainError::MissingDefineHeader {
            artifact,
            name: name.to_string(),
        });
    }
    let mut depth: i64 = 0;
    for ch in content.chars() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    break;
                }
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(DomainError::UnbalancedParentheses {
            artifact,
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Find `marker` and return the whitespace-delimited symbol after it,
/// with any trailing `)` stripped
fn header_symbol(content: &str, marker: &str) -> Option<String> {
    for line in content.lines() {
        if let Some(pos) = line.find(marker) {
            let rest = line[pos + marker.len()..].trim_start();
            let symbol: String = rest
                .chars()
                .take_while(|c| !c.is_whitespace() && *c != ')')
                .collect();
            if !symbol.is_empty() {
                return Some(symbol);
            }
        }
    }
    None
}
