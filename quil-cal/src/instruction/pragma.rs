use crate::quil::{Quil, ToQuilResult};

/// The pragma with which a measurement calibration names the memory its filter nodes read.
pub const LOAD_MEMORY: &str = "LOAD-MEMORY";

/// A `PRAGMA`, carried through unchanged. Calibration programs use these to configure readout
/// filter nodes, which this crate never interprets.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Pragma {
    pub name: String,
    pub arguments: Vec<PragmaArgument>,
    pub data: Option<String>,
}

impl Pragma {
    pub fn new(name: String, arguments: Vec<PragmaArgument>, data: Option<String>) -> Self {
        Self {
            name,
            arguments,
            data,
        }
    }

    /// Whether this is a `LOAD-MEMORY` pragma whose data is `variable`.
    pub fn loads_memory_into(&self, variable: &str) -> bool {
        self.name == LOAD_MEMORY && self.data.as_deref() == Some(variable)
    }
}

impl Quil for Pragma {
    fn write(&self, f: &mut impl std::fmt::Write, _fall_back_to_debug: bool) -> ToQuilResult<()> {
        write!(f, "PRAGMA {}", self.name)?;
        for argument in &self.arguments {
            write!(f, " {argument}")?;
        }
        match &self.data {
            Some(data) => write!(f, " {data:?}").map_err(Into::into),
            None => Ok(()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PragmaArgument {
    Identifier(String),
    Integer(u64),
}

impl std::fmt::Display for PragmaArgument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Identifier(name) => write!(f, "{name}"),
            Self::Integer(value) => write!(f, "{value}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_node_pragma() {
        let pragma = Pragma::new(
            "FILTER-NODE".to_string(),
            vec![
                PragmaArgument::Identifier("q0_ro".to_string()),
                PragmaArgument::Integer(2),
            ],
            Some("{'module':'lodgepole.filters.io'}".to_string()),
        );
        assert_eq!(
            pragma.to_quil().unwrap(),
            "PRAGMA FILTER-NODE q0_ro 2 \"{'module':'lodgepole.filters.io'}\""
        );
        assert!(!pragma.loads_memory_into("addr"));
    }

    #[test]
    fn load_memory_pragma() {
        let pragma = Pragma::new(
            LOAD_MEMORY.to_string(),
            vec![PragmaArgument::Identifier("q0_unclassified".to_string())],
            Some("addr".to_string()),
        );
        assert!(pragma.loads_memory_into("addr"));
        assert!(!pragma.loads_memory_into("ro"));
        assert_eq!(
            pragma.to_quil().unwrap(),
            "PRAGMA LOAD-MEMORY q0_unclassified \"addr\""
        );
    }
}
