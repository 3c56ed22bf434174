//! Compact content-model notation
//!
//! A one-line text form of a content model, replayed onto
//! [`ContentModelBuilder`] the same way a schema reader would:
//!
//! ```text
//! (title, author+, (chapter | appendix){2,unbounded}, any[##other]*)
//! mixed (em | strong)*
//! all(name, address?, phone)
//! EMPTY    ANY    TEXT
//! ```
//!
//! Every name occurrence gets a particle of its own. Writing the same name
//! with the same `#id` suffix (`a#1 | a#1`) reuses one particle.

use std::collections::HashMap;

use crate::error::{Error, ParseError, Result};
use crate::limits::Limits;
use crate::names::validate_qname;
use crate::namespaces::{NamespaceContext, QName};
use crate::validators::{
    AllGroupBuilder, CompileOptions, ContentCategory, ContentModelBuilder, ContentValidator,
    NamespaceConstraint, Occurs, Particle, ParticleKind, ParticleRef,
};

/// Compile a model written in the notation
pub fn compile(
    text: &str,
    namespaces: &NamespaceContext,
    options: &CompileOptions,
) -> Result<ContentValidator> {
    NotationParser::new(text, namespaces, &options.limits).parse(options)
}

/// Compile with no namespace prefixes and default options
pub fn compile_str(text: &str) -> Result<ContentValidator> {
    compile(text, &NamespaceContext::new(), &CompileOptions::default())
}

const DELIMITERS: &[char] = &[',', '|', '(', ')', '?', '*', '+', '{', '}', '[', ']', '#'];

struct NotationParser<'a> {
    src: &'a str,
    pos: usize,
    namespaces: &'a NamespaceContext,
    limits: &'a Limits,
    depth: usize,
    shared: HashMap<String, ParticleRef>,
}

impl<'a> NotationParser<'a> {
    fn new(src: &'a str, namespaces: &'a NamespaceContext, limits: &'a Limits) -> Self {
        Self {
            src,
            pos: 0,
            namespaces,
            limits,
            depth: 0,
            shared: HashMap::new(),
        }
    }

    fn parse(mut self, options: &CompileOptions) -> Result<ContentValidator> {
        let mut mixed = false;
        let mut open = false;
        loop {
            if self.eat_keyword("mixed") {
                mixed = true;
            } else if self.eat_keyword("open") {
                open = true;
            } else {
                break;
            }
        }
        let category = if mixed {
            ContentCategory::Mixed
        } else {
            ContentCategory::ElementOnly
        };

        for (keyword, validator) in [
            ("EMPTY", ContentValidator::EMPTY),
            ("ANY", ContentValidator::ANY),
            ("TEXT", ContentValidator::TEXT_ONLY),
        ] {
            if self.eat_keyword(keyword) {
                self.expect_end()?;
                return Ok(validator);
            }
        }

        let start = self.pos;
        if self.eat_keyword("all") {
            self.skip_ws();
            if self.peek() == Some('(') {
                return self.parse_all(category, open);
            }
            self.pos = start;
        }

        let mut builder = ContentModelBuilder::new(category);
        builder.set_open(open);
        self.skip_ws();
        if self.peek().is_some() {
            builder.open_group();
            self.parse_list(&mut builder)?;
            builder.close_group();
        }
        self.expect_end()?;
        builder.finish_with(options)
    }

    fn parse_all(&mut self, category: ContentCategory, open: bool) -> Result<ContentValidator> {
        self.expect('(')?;
        let mut builder = AllGroupBuilder::new(category);
        builder.set_open(open);

        self.skip_ws();
        if self.peek() != Some(')') {
            loop {
                let name = self.parse_name()?;
                let id = self.parse_id()?;
                let occurs = self.parse_quantifier()?;
                if occurs.max != Some(1) {
                    return Err(self.error("all group members may occur at most once"));
                }
                let particle = self.particle(Particle::element(name.clone(), occurs), id);
                builder.add_element(name, particle, occurs.min > 0)?;
                self.skip_ws();
                if self.peek() != Some(',') {
                    break;
                }
                self.bump();
            }
        }
        self.expect(')')?;
        self.expect_end()?;
        Ok(builder.finish())
    }

    /// Items separated by one kind of separator
    fn parse_list(&mut self, builder: &mut ContentModelBuilder) -> Result<()> {
        let mut separator = None;
        loop {
            self.parse_item(builder)?;
            self.skip_ws();
            let Some(c @ (',' | '|')) = self.peek() else {
                return Ok(());
            };
            if separator.is_some_and(|s| s != c) {
                return Err(self.error("',' and '|' cannot be mixed in one group"));
            }
            separator = Some(c);
            self.bump();
            if c == ',' {
                builder.add_sequence();
            } else {
                builder.add_choice();
            }
        }
    }

    fn parse_item(&mut self, builder: &mut ContentModelBuilder) -> Result<()> {
        self.skip_ws();
        match self.peek() {
            Some('(') => {
                self.bump();
                self.depth += 1;
                self.limits.check_nesting_depth(self.depth)?;
                builder.open_group();
                self.skip_ws();
                if self.peek() != Some(')') {
                    self.parse_list(builder)?;
                }
                self.expect(')')?;
                builder.close_group();
                self.depth -= 1;
                let occurs = self.parse_quantifier()?;
                builder.add_occurs(occurs);
            }
            Some(_) => {
                let start = self.pos;
                let token = self.take_token();
                if token.is_empty() {
                    return Err(self.error("expected a name, a wildcard or a group"));
                }
                if token == "any" {
                    let constraint = self.parse_wildcard()?;
                    let id = self.parse_id()?;
                    let occurs = self.parse_quantifier()?;
                    let particle = self.particle(Particle::any(constraint.clone(), occurs), id);
                    builder.add_wildcard(&constraint, particle);
                    builder.add_occurs(occurs);
                } else {
                    self.pos = start;
                    let name = self.parse_name()?;
                    let id = self.parse_id()?;
                    let occurs = self.parse_quantifier()?;
                    let particle = self.particle(Particle::element(name.clone(), occurs), id);
                    builder.add_name(&name, particle);
                    builder.add_occurs(occurs);
                }
            }
            None => return Err(self.error("unexpected end of model")),
        }
        Ok(())
    }

    fn parse_name(&mut self) -> Result<QName> {
        self.skip_ws();
        let token = self.take_token();
        validate_qname(token)?;
        self.namespaces.resolve(token)
    }

    /// Optional `[namespace list]` after `any`
    fn parse_wildcard(&mut self) -> Result<NamespaceConstraint> {
        let namespaces = self.namespaces;
        let target = namespaces.default_namespace();
        if self.peek() != Some('[') {
            return Ok(NamespaceConstraint::Any);
        }
        self.bump();
        let src = self.src;
        let rest = &src[self.pos..];
        let Some(len) = rest.find(']') else {
            return Err(self.error("unterminated wildcard namespace list"));
        };
        let value = rest[..len].trim();
        self.pos += len + 1;
        let constraint = match value.strip_prefix("not ") {
            Some(list) => NamespaceConstraint::from_not_namespace_attr(list, target)?,
            None => NamespaceConstraint::from_namespace_attr(value, target)?,
        };
        Ok(constraint)
    }

    /// Optional `#id` particle identity
    fn parse_id(&mut self) -> Result<Option<String>> {
        if self.peek() != Some('#') {
            return Ok(None);
        }
        self.bump();
        let id = self.take_token();
        if id.is_empty() {
            return Err(self.error("expected a particle identifier after '#'"));
        }
        Ok(Some(id.to_string()))
    }

    fn parse_quantifier(&mut self) -> Result<Occurs> {
        self.skip_ws();
        let occurs = match self.peek() {
            Some('?') => Occurs::optional(),
            Some('*') => Occurs::zero_or_more(),
            Some('+') => Occurs::one_or_more(),
            Some('{') => {
                self.bump();
                let min = self.parse_bound()?;
                self.skip_ws();
                let max = if self.peek() == Some(',') {
                    self.bump();
                    self.skip_ws();
                    if self.eat_keyword("unbounded") {
                        None
                    } else {
                        Some(self.parse_bound()?)
                    }
                } else {
                    Some(min)
                };
                self.skip_ws();
                if self.peek() != Some('}') {
                    return Err(self.error("expected '}'"));
                }
                if max.is_some_and(|max| max < min) {
                    return Err(self.error("maximum occurrence is lower than the minimum"));
                }
                Occurs::new(min, max)
            }
            _ => return Ok(Occurs::once()),
        };
        self.bump();
        Ok(occurs)
    }

    fn parse_bound(&mut self) -> Result<u32> {
        self.skip_ws();
        let digits = self.src[self.pos..]
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(self.src.len() - self.pos);
        let text = &self.src[self.pos..self.pos + digits];
        let value = text
            .parse::<u32>()
            .map_err(|_| self.error(format!("invalid occurrence bound '{}'", text)))?;
        self.limits.check_occurs_literal(value)?;
        self.pos += digits;
        Ok(value)
    }

    fn particle(&mut self, particle: Particle, id: Option<String>) -> ParticleRef {
        let Some(id) = id else {
            return ParticleRef::new(particle);
        };
        let key = match &particle.kind {
            ParticleKind::Element(name) => format!("{}#{}", name, id),
            other => format!("{:?}#{}", other, id),
        };
        self.shared
            .entry(key)
            .or_insert_with(|| ParticleRef::new(particle))
            .clone()
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn take_token(&mut self) -> &'a str {
        let src = self.src;
        let rest = &src[self.pos..];
        let len = rest
            .find(|c: char| c.is_whitespace() || DELIMITERS.contains(&c))
            .unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        self.skip_ws();
        let rest = &self.src[self.pos..];
        let Some(after) = rest.strip_prefix(keyword) else {
            return false;
        };
        let boundary = after
            .chars()
            .next()
            .map_or(true, |c| c.is_whitespace() || DELIMITERS.contains(&c));
        if boundary {
            self.pos += keyword.len();
        }
        boundary
    }

    fn expect(&mut self, c: char) -> Result<()> {
        self.skip_ws();
        if self.peek() == Some(c) {
            self.bump();
            Ok(())
        } else {
            Err(self.error(format!("expected '{}'", c)))
        }
    }

    fn expect_end(&mut self) -> Result<()> {
        self.skip_ws();
        match self.peek() {
            None => Ok(()),
            Some(c) => Err(self.error(format!("unexpected '{}'", c))),
        }
    }

    fn error(&self, message: impl Into<String>) -> Error {
        ParseError::new(message).at(self.pos).with_source(self.src)
            .into()
    }
}
