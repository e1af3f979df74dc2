//! Language registry: a closed enumeration mapping a language tag to its
//! file extension and UI name.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    PYTHON,
    CPLUSPLUS,
    AQAASM,
}

impl Language {
    pub fn file_extension(&self) -> &'static str {
        match self {
            Language::PYTHON => "py",
            Language::CPLUSPLUS => "cpp",
            Language::AQAASM => "aqaasm",
        }
    }

    pub fn ui_name(&self) -> &'static str {
        match self {
            Language::PYTHON => "Python",
            Language::CPLUSPLUS => "C++",
            Language::AQAASM => "AQA Assembly",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_round_trip() {
        for lang in [Language::PYTHON, Language::CPLUSPLUS, Language::AQAASM] {
            let json = serde_json::to_string(&lang).unwrap();
            let back: Language = serde_json::from_str(&json).unwrap();
            assert_eq!(back, lang);
        }
    }

    #[test]
    fn extensions_and_names_are_distinct() {
        let langs = [Language::PYTHON, Language::CPLUSPLUS, Language::AQAASM];
        let exts: Vec<_> = langs.iter().map(|l| l.file_extension()).collect();
        let names: Vec<_> = langs.iter().map(|l| l.ui_name()).collect();
        assert_eq!(exts.len(), 3);
        assert_eq!(names.len(), 3);
    }
}
