use crate::query::QueryError;
use logos::{Lexer, Logos};

#[derive(Logos, Debug, PartialEq)]
enum QueryToken {
    #[token("&")]
    Separator,

    #[token("=")]
    Assign,

    #[regex("[^&=]+")]
    Text,
}

/// Split a query string into `(key, value)` pairs.
///
/// Pairs are separated by `&`. A key without `=` has an empty value.
/// Empty pairs (`a=1&&b=2`) are skipped.
pub(crate) fn pairs(query: &str) -> Result<Vec<(&str, &str)>, QueryError> {
    let mut lex = Lexer::<'_, QueryToken>::new(query);
    let mut pairs = Vec::new();

    let mut key: Option<&str> = None;
    let mut value: Option<&str> = None;
    let mut assigned = false;

    while let Some(token) = lex.next() {
        let Ok(token) = token else {
            return Err(QueryError::Malformed {
                query: query.to_owned(),
            });
        };
        match token {
            QueryToken::Separator => {
                if let Some(key) = key.take() {
                    pairs.push((key, value.take().unwrap_or_default()));
                } else if assigned {
                    return Err(QueryError::Malformed {
                        query: query.to_owned(),
                    });
                }
                assigned = false;
            }
            QueryToken::Assign => {
                if key.is_none() || assigned {
                    return Err(QueryError::Malformed {
                        query: query.to_owned(),
                    });
                }
                assigned = true;
            }
            QueryToken::Text if !assigned && key.is_none() => key = Some(lex.slice()),
            QueryToken::Text if assigned && value.is_none() => value = Some(lex.slice()),
            QueryToken::Text => {
                return Err(QueryError::Malformed {
                    query: query.to_owned(),
                });
            }
        }
    }
    if let Some(key) = key {
        pairs.push((key, value.unwrap_or_default()));
    } else if assigned {
        return Err(QueryError::Malformed {
            query: query.to_owned(),
        });
    }

    Ok(pairs)
}
