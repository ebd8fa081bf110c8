use chrono::{DateTime, Datelike, Local, Timelike};
use thiserror::Error;

pub const DEFAULT_TEMPLATE: &str = "{year}-{month}-{day}-{hour}.{minute} - {label}";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplatePart {
    Literal(String),
    Token(Token),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
    Label,
    OrigName,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("template is empty")]
    Empty,
    #[error("unbalanced braces in template")]
    UnbalancedBraces,
    #[error("unknown token: {0}")]
    UnknownToken(String),
}

/// Values a template is rendered against.
#[derive(Debug, Clone, Copy)]
pub struct NameContext<'a> {
    pub date: DateTime<Local>,
    pub label: &'a str,
    pub original_stem: &'a str,
}

pub fn validate_template(input: &str) -> Result<(), TemplateError> {
    parse_template(input).map(|_| ())
}

pub fn parse_template(input: &str) -> Result<Vec<TemplatePart>, TemplateError> {
    if input.is_empty() {
        return Err(TemplateError::Empty);
    }

    let mut parts = Vec::new();
    let mut literal = String::new();
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '{' => {
                if !literal.is_empty() {
                    parts.push(TemplatePart::Literal(std::mem::take(&mut literal)));
                }
                let mut token = String::new();
                let mut found_close = false;
                for next in chars.by_ref() {
                    if next == '}' {
                        found_close = true;
                        break;
                    }
                    if next == '{' {
                        return Err(TemplateError::UnbalancedBraces);
                    }
                    token.push(next);
                }
                if !found_close || token.is_empty() {
                    return Err(TemplateError::UnbalancedBraces);
                }
                parts.push(TemplatePart::Token(parse_token(&token)?));
            }
            '}' => return Err(TemplateError::UnbalancedBraces),
            _ => literal.push(ch),
        }
    }

    if !literal.is_empty() {
        parts.push(TemplatePart::Literal(literal));
    }

    if parts.is_empty() {
        return Err(TemplateError::Empty);
    }

    Ok(parts)
}

/// Date components render without leading zeros unless `pad` is set.
pub fn render_template(parts: &[TemplatePart], ctx: &NameContext<'_>, pad: bool) -> String {
    let mut output = String::new();
    for part in parts {
        match part {
            TemplatePart::Literal(s) => output.push_str(s),
            TemplatePart::Token(token) => {
                let value = match token {
                    Token::Year => ctx.date.year().to_string(),
                    Token::Month => date_component(ctx.date.month(), pad),
                    Token::Day => date_component(ctx.date.day(), pad),
                    Token::Hour => date_component(ctx.date.hour(), pad),
                    Token::Minute => date_component(ctx.date.minute(), pad),
                    Token::Second => date_component(ctx.date.second(), pad),
                    Token::Label => ctx.label.trim().to_string(),
                    Token::OrigName => ctx.original_stem.to_string(),
                };
                output.push_str(&value);
            }
        }
    }

    output
}

fn date_component(value: u32, pad: bool) -> String {
    if pad {
        format!("{:02}", value)
    } else {
        value.to_string()
    }
}

fn parse_token(token: &str) -> Result<Token, TemplateError> {
    match token {
        "year" => Ok(Token::Year),
        "month" => Ok(Token::Month),
        "day" => Ok(Token::Day),
        "hour" => Ok(Token::Hour),
        "minute" => Ok(Token::Minute),
        "second" => Ok(Token::Second),
        "label" => Ok(Token::Label),
        "orig_name" => Ok(Token::OrigName),
        other => Err(TemplateError::UnknownToken(other.to_string())),
    }
}
