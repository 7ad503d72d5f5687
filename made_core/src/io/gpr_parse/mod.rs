//! Module for parsing Gene Protein Reaction strings into AST values

use crate::io::gpr_parse::lexer::LexerError;
use crate::io::gpr_parse::parser::ParseError;
use crate::metabolic_model::gene::Gene;
use crate::metabolic_model::model::Gpr;
use indexmap::IndexMap;
use thiserror::Error;

mod lexer;
pub mod parser;
mod token;

/// Parse a Gene Protein Reaction string into a GPR Tree
///
/// # Parameters
/// - `input`: &str representing the gene protein reaction rule
/// - `gene_map`: map of gene id strings to genes, genes in the rule which are missing from
///   the map are inserted as active genes
///
/// # Returns
/// Parse result which is
/// - `Ok`: The root node of the GPR tree
/// - `Err`: Returns the GprParseError describing the issue with the GPR rule which
///   was being parsed.
///
/// # Examples
/// ```rust
/// use indexmap::IndexMap;
/// use made_core::io::gpr_parse::parse_gpr;
/// let gpr: &str = "Rv0001 and Rv0002";
/// let mut gene_map = IndexMap::new();
/// let gpr_tree = parse_gpr(gpr, &mut gene_map).unwrap();
/// assert_eq!(gene_map.len(), 2);
/// ```
pub fn parse_gpr(
    input: &str,
    gene_map: &mut IndexMap<String, Gene>,
) -> Result<Gpr, GprParseError> {
    // Start by creating a lexer
    let mut lexer = lexer::Lexer::new(input);
    // Convert the GPR string into tokens
    let tokens = lexer.lex()?;

    // Now parse those tokens into a GPR tree
    let mut parser = parser::GPRParser::new(tokens, gene_map);
    let gpr = parser.parse()?;
    Ok(gpr)
}

/// Enum representing possible lex and parse errors
#[derive(Debug, Error)]
pub enum GprParseError {
    /// Lexing Error
    #[error("Error occurred during lexing (conversion of GPR string to tokens): {0}")]
    LexingError(#[from] LexerError),
    /// Parsing Error
    #[error("Error occurred during parsing (conversion of tokens to GPR tree): {0}")]
    ParsingError(#[from] ParseError),
}

#[cfg(test)]
mod tests {
    use crate::io::gpr_parse::parse_gpr;
    use crate::metabolic_model::gene::{Gene, GeneActivity};
    use crate::metabolic_model::model::{Gpr, GprOperation};
    use indexmap::IndexMap;

    #[test]
    fn test_parse_gpr() {
        let gpr = "Rv0001 and (Rv0002 or Rv0003)";
        let mut gene_map: IndexMap<String, Gene> = IndexMap::new();
        gene_map.insert(
            "Rv0001".to_string(),
            Gene::new(
                "Rv0001".to_string(),
                None,
                GeneActivity::Inactive,
                None,
                None,
            ),
        );
        let gpr_tree = parse_gpr(gpr, &mut gene_map).unwrap();
        // Existing genes are left untouched, new ones are added
        assert_eq!(gene_map.len(), 3);
        assert_eq!(
            gene_map.get("Rv0001").unwrap().activity,
            GeneActivity::Inactive
        );
        match gpr_tree {
            Gpr::Operation(GprOperation::And { left, right }) => {
                match *left {
                    Gpr::GeneNode(g) => assert_eq!(g, "Rv0001"),
                    _ => panic!("Incorrect Parse"),
                }
                match *right {
                    Gpr::Operation(GprOperation::Or { .. }) => {}
                    _ => panic!("Incorrect Parse"),
                }
            }
            _ => panic!("Incorrect gpr parse"),
        }
    }

    #[test]
    fn test_parse_errors() {
        let mut gene_map = IndexMap::new();
        assert!(parse_gpr("Rv0001 | Rv0002", &mut gene_map).is_err());
        assert!(parse_gpr("Rv0001 and", &mut gene_map).is_err());
    }
}
