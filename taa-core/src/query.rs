//! Parameterized query templates
//!
//! Templates carry four literal placeholder tokens. Substitution is plain
//! substring replacement; there is no escaping, so any occurrence of a
//! token anywhere in the text is replaced.

use crate::dates::{Horizon, RunDate};

/// Placeholder tokens recognised in query templates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Token {
    Year,
    Month,
    Day,
    Horizon,
}

impl Token {
    pub const ALL: [Token; 4] = [Token::Year, Token::Month, Token::Day, Token::Horizon];

    pub fn as_str(self) -> &'static str {
        match self {
            Token::Year => "@year",
            Token::Month => "@month",
            Token::Day => "@day",
            Token::Horizon => "@horizon",
        }
    }
}

/// Values substituted into a template for one horizon
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryParameters {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub horizon: Horizon,
}

impl QueryParameters {
    pub fn new(date: &RunDate, horizon: Horizon) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
            day: date.day(),
            horizon,
        }
    }

    /// Decimal rendering of a token's value, without padding
    pub fn value_of(&self, token: Token) -> String {
        match token {
            Token::Year => self.year.to_string(),
            Token::Month => self.month.to_string(),
            Token::Day => self.day.to_string(),
            Token::Horizon => self.horizon.to_string(),
        }
    }
}

/// Raw template text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTemplate {
    text: String,
}

impl QueryTemplate {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Replace every occurrence of one token
    pub fn substitute(self, token: Token, value: &str) -> Self {
        Self {
            text: self.text.replace(token.as_str(), value),
        }
    }

    /// Substitute all tokens and return the query text
    pub fn render(&self, params: &QueryParameters) -> String {
        Token::ALL
            .iter()
            .fold(self.clone(), |template, token| {
                template.substitute(*token, &params.value_of(*token))
            })
            .text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::HORIZONS;

    fn params() -> QueryParameters {
        QueryParameters::new(&RunDate::new(2023, 8, 5).unwrap(), HORIZONS[1])
    }

    #[test]
    fn test_render_substitutes_all_tokens() {
        let template = QueryTemplate::new("... @year @month @day @horizon ...");
        assert_eq!(template.render(&params()), "... 2023 8 5 2 ...");
    }

    #[test]
    fn test_substitution_order_does_not_matter() {
        let template = QueryTemplate::new("... @year @month @day @horizon ...");
        let p = params();

        let orders: [[Token; 4]; 4] = [
            [Token::Year, Token::Month, Token::Day, Token::Horizon],
            [Token::Horizon, Token::Day, Token::Month, Token::Year],
            [Token::Day, Token::Year, Token::Horizon, Token::Month],
            [Token::Month, Token::Horizon, Token::Year, Token::Day],
        ];
        for order in orders {
            let rendered = order
                .iter()
                .fold(template.clone(), |t, token| t.substitute(*token, &p.value_of(*token)));
            assert_eq!(rendered.as_str(), "... 2023 8 5 2 ...");
        }
    }

    #[test]
    fn test_render_is_idempotent() {
        let template = QueryTemplate::new("select * where y = @year and h = @horizon");
        let once = template.render(&params());
        let twice = QueryTemplate::new(once.clone()).render(&params());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_repeated_tokens_are_all_replaced() {
        let template = QueryTemplate::new("@horizon/@horizon/FinalDollars_h@horizon");
        assert_eq!(template.render(&params()), "2/2/FinalDollars_h2");
    }

    #[test]
    fn test_literal_token_text_is_not_protected() {
        // No escaping: a token inside a string literal is still replaced.
        let template = QueryTemplate::new("select '@year' as label, @year as y");
        assert_eq!(
            template.render(&params()),
            "select '2023' as label, 2023 as y"
        );
    }
}
