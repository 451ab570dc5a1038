//! A small XPath subset evaluated over `scraper` documents.
//!
//! Supported grammar:
//!
//! ```text
//! path      := ('/' | '//')? step (('/' | '//') step)*
//! step      := '.' | '..' | nametest predicate*
//! nametest  := '*' | NAME
//! predicate := '[' ( INTEGER | 'last()' | '@' NAME ( '=' LITERAL )?
//!                  | 'contains(' '@' NAME ',' LITERAL ')' | 'text()' '=' LITERAL ) ']'
//! ```
//!
//! A path without a leading slash starts at the document, like `/`.
//! Element names and attribute names compare case-insensitively because the
//! HTML parser lowercases them.

use std::collections::{HashMap, HashSet};

use scraper::{ElementRef, Html};

/// Error type for path expressions that fall outside the supported subset.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum XPathError {
    #[error("empty path expression")]
    Empty,

    #[error("unexpected {found} at offset {offset} in '{expr}'")]
    Unexpected { expr: String, offset: usize, found: String },

    #[error("position predicates are 1-based, got [0] in '{0}'")]
    ZeroPosition(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Child,
    /// `//name`: children of the context or any of its descendants.
    Descendant,
    SelfNode,
    Parent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum NameTest {
    Any,
    Named(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Predicate {
    Position(usize),
    Last,
    HasAttr(String),
    AttrEq(String, String),
    AttrContains(String, String),
    TextEq(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    axis: Axis,
    test: NameTest,
    predicates: Vec<Predicate>,
}

/// A parsed path expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XPath {
    source: String,
    steps: Vec<Step>,
}

/// Evaluation context: the document node itself or one of its elements.
#[derive(Clone, Copy)]
enum Context<'a> {
    Document,
    Element(ElementRef<'a>),
}

impl XPath {
    /// Parse a path expression.
    pub fn parse(expr: &str) -> Result<Self, XPathError> {
        let source = expr.trim();
        if source.is_empty() {
            return Err(XPathError::Empty);
        }
        let steps = Parser { src: source, pos: 0 }.path()?;
        Ok(Self { source: source.to_string(), steps })
    }

    /// The expression text as parsed (trimmed).
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Parse a path relative to an item element. An empty expression selects
    /// the item itself; anything else must start with `/` or `//`.
    pub fn parse_relative(expr: &str) -> Result<Option<Self>, XPathError> {
        let source = expr.trim();
        match source.chars().next() {
            None => Ok(None),
            Some('/') => Self::parse(source).map(Some),
            Some(c) => Err(XPathError::Unexpected { expr: source.to_string(), offset: 0, found: format!("'{c}'") }),
        }
    }

    /// Absolute positional path that selects exactly `element` again.
    ///
    /// Each step's index counts preceding siblings with the same tag name.
    pub fn locate(element: ElementRef<'_>) -> Self {
        let mut steps = Vec::new();
        let mut rendered = Vec::new();
        let mut current = Some(element);

        while let Some(el) = current {
            let name = el.value().name();
            let position = 1 + el
                .prev_siblings()
                .filter_map(ElementRef::wrap)
                .filter(|sibling| sibling.value().name() == name)
                .count();
            rendered.push(format!("/{name}[{position}]"));
            steps.push(Step {
                axis: Axis::Child,
                test: NameTest::Named(name.to_string()),
                predicates: vec![Predicate::Position(position)],
            });
            current = el.parent().and_then(ElementRef::wrap);
        }
        steps.reverse();
        rendered.reverse();

        Self { source: rendered.concat(), steps }
    }

    /// Evaluate against a whole document; results are in document order
    /// without duplicates.
    pub fn select<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>> {
        self.evaluate(document, Context::Document)
    }

    /// Evaluate with `context` as the starting node: `/a` selects its `a`
    /// children, `//a` its `a` descendants.
    pub fn select_from<'a>(&self, document: &'a Html, context: ElementRef<'a>) -> Vec<ElementRef<'a>> {
        self.evaluate(document, Context::Element(context))
    }

    /// First match under `context` in document order.
    pub fn select_first_from<'a>(&self, document: &'a Html, context: ElementRef<'a>) -> Option<ElementRef<'a>> {
        self.select_from(document, context).into_iter().next()
    }

    fn evaluate<'a>(&self, document: &'a Html, start: Context<'a>) -> Vec<ElementRef<'a>> {
        let mut contexts = vec![start];

        for step in &self.steps {
            let mut seen = HashSet::new();
            let mut next = Vec::new();
            for context in &contexts {
                for element in step.apply(document, *context) {
                    if seen.insert(element.id()) {
                        next.push(Context::Element(element));
                    }
                }
            }
            contexts = next;
            if contexts.is_empty() {
                break;
            }
        }

        let mut selected: Vec<ElementRef<'a>> = contexts
            .into_iter()
            .filter_map(|c| match c {
                Context::Element(e) => Some(e),
                Context::Document => None,
            })
            .collect();

        if selected.len() > 1 && self.steps.iter().any(|s| matches!(s.axis, Axis::Descendant | Axis::Parent)) {
            let order: HashMap<_, usize> =
                document.root_element().descendants().enumerate().map(|(i, n)| (n.id(), i)).collect();
            selected.sort_by_key(|e| order.get(&e.id()).copied().unwrap_or(usize::MAX));
        }

        selected
    }

    /// First match in document order.
    pub fn select_first<'a>(&self, document: &'a Html) -> Option<ElementRef<'a>> {
        self.select(document).into_iter().next()
    }
}

impl std::fmt::Display for XPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

impl std::str::FromStr for XPath {
    type Err = XPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn element_children<'a>(document: &'a Html, context: Context<'a>) -> Vec<ElementRef<'a>> {
    match context {
        Context::Document => vec![document.root_element()],
        Context::Element(e) => e.children().filter_map(ElementRef::wrap).collect(),
    }
}

impl Step {
    fn apply<'a>(&self, document: &'a Html, context: Context<'a>) -> Vec<ElementRef<'a>> {
        match self.axis {
            Axis::Child => self.filter(element_children(document, context)),
            Axis::Descendant => {
                // descendant-or-self::node()/child::test, with predicates
                // evaluated per parent as XPath does.
                let mut bases = vec![context];
                let root = match context {
                    Context::Document => document.root_element(),
                    Context::Element(e) => e,
                };
                if matches!(context, Context::Document) {
                    bases.push(Context::Element(root));
                }
                bases.extend(root.descendants().skip(1).filter_map(ElementRef::wrap).map(Context::Element));

                bases
                    .into_iter()
                    .flat_map(|base| self.filter(element_children(document, base)))
                    .collect()
            }
            Axis::SelfNode => match context {
                Context::Element(e) => self.filter(vec![e]),
                Context::Document => Vec::new(),
            },
            Axis::Parent => match context {
                Context::Element(e) => self.filter(e.parent().and_then(ElementRef::wrap).into_iter().collect()),
                Context::Document => Vec::new(),
            },
        }
    }

    fn filter<'a>(&self, candidates: Vec<ElementRef<'a>>) -> Vec<ElementRef<'a>> {
        let mut nodes: Vec<ElementRef<'a>> = candidates.into_iter().filter(|e| self.test.matches(e)).collect();
        for predicate in &self.predicates {
            nodes = predicate.apply(nodes);
        }
        nodes
    }
}

impl NameTest {
    fn matches(&self, element: &ElementRef<'_>) -> bool {
        match self {
            NameTest::Any => true,
            NameTest::Named(name) => element.value().name().eq_ignore_ascii_case(name),
        }
    }
}

impl Predicate {
    fn apply<'a>(&self, nodes: Vec<ElementRef<'a>>) -> Vec<ElementRef<'a>> {
        match self {
            Predicate::Position(n) => nodes.get(n - 1).copied().into_iter().collect(),
            Predicate::Last => nodes.last().copied().into_iter().collect(),
            Predicate::HasAttr(attr) => nodes.into_iter().filter(|e| e.value().attr(attr).is_some()).collect(),
            Predicate::AttrEq(attr, value) => nodes
                .into_iter()
                .filter(|e| e.value().attr(attr) == Some(value.as_str()))
                .collect(),
            Predicate::AttrContains(attr, value) => nodes
                .into_iter()
                .filter(|e| e.value().attr(attr).is_some_and(|v| v.contains(value.as_str())))
                .collect(),
            Predicate::TextEq(value) => nodes
                .into_iter()
                .filter(|e| e.text().collect::<String>() == *value)
                .collect(),
        }
    }
}

struct Parser<'s> {
    src: &'s str,
    pos: usize,
}

impl<'s> Parser<'s> {
    fn rest(&self) -> &'s str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn eat(&mut self, token: &str) -> bool {
        if self.rest().starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.src.len() - trimmed.len();
    }

    fn unexpected(&self) -> XPathError {
        let found = match self.peek() {
            Some(c) => format!("'{c}'"),
            None => "end of expression".to_string(),
        };
        XPathError::Unexpected { expr: self.src.to_string(), offset: self.pos, found }
    }

    fn expect(&mut self, token: &str) -> Result<(), XPathError> {
        self.skip_ws();
        if self.eat(token) { Ok(()) } else { Err(self.unexpected()) }
    }

    fn path(mut self) -> Result<Vec<Step>, XPathError> {
        let mut steps = Vec::new();
        let mut axis = if self.eat("//") {
            Axis::Descendant
        } else {
            self.eat("/");
            Axis::Child
        };

        loop {
            steps.push(self.step(axis)?);
            if self.eat("//") {
                axis = Axis::Descendant;
            } else if self.eat("/") {
                axis = Axis::Child;
            } else {
                break;
            }
        }

        self.skip_ws();
        if self.pos < self.src.len() {
            return Err(self.unexpected());
        }
        Ok(steps)
    }

    fn step(&mut self, axis: Axis) -> Result<Step, XPathError> {
        let (axis, test) = if self.eat("..") {
            if axis == Axis::Descendant {
                return Err(self.unexpected());
            }
            (Axis::Parent, NameTest::Any)
        } else if self.eat(".") {
            if axis == Axis::Descendant {
                return Err(self.unexpected());
            }
            (Axis::SelfNode, NameTest::Any)
        } else if self.eat("*") {
            (axis, NameTest::Any)
        } else {
            let name = self.name().ok_or_else(|| self.unexpected())?;
            (axis, NameTest::Named(name.to_ascii_lowercase()))
        };

        let mut predicates = Vec::new();
        while self.eat("[") {
            predicates.push(self.predicate()?);
            self.expect("]")?;
        }

        Ok(Step { axis, test, predicates })
    }

    fn predicate(&mut self) -> Result<Predicate, XPathError> {
        self.skip_ws();

        if let Some(n) = self.number() {
            if n == 0 {
                return Err(XPathError::ZeroPosition(self.src.to_string()));
            }
            return Ok(Predicate::Position(n));
        }

        if self.eat("last()") {
            return Ok(Predicate::Last);
        }

        if self.eat("@") {
            let attr = self.attr_name()?;
            self.skip_ws();
            if self.eat("=") {
                let value = self.literal()?;
                return Ok(Predicate::AttrEq(attr, value));
            }
            return Ok(Predicate::HasAttr(attr));
        }

        if self.eat("contains(") {
            self.expect("@")?;
            let attr = self.attr_name()?;
            self.expect(",")?;
            let value = self.literal()?;
            self.expect(")")?;
            return Ok(Predicate::AttrContains(attr, value));
        }

        if self.eat("text()") {
            self.expect("=")?;
            let value = self.literal()?;
            return Ok(Predicate::TextEq(value));
        }

        Err(self.unexpected())
    }

    fn name(&mut self) -> Option<&'s str> {
        let rest = self.rest();
        let first = rest.chars().next()?;
        if !(first.is_ascii_alphabetic() || first == '_') {
            return None;
        }
        let len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | ':')))
            .unwrap_or(rest.len());
        self.pos += len;
        Some(&rest[..len])
    }

    fn attr_name(&mut self) -> Result<String, XPathError> {
        self.name()
            .map(|n| n.to_ascii_lowercase())
            .ok_or_else(|| self.unexpected())
    }

    fn number(&mut self) -> Option<usize> {
        let rest = self.rest();
        let len = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        if len == 0 {
            return None;
        }
        let n = rest[..len].parse().ok()?;
        self.pos += len;
        Some(n)
    }

    fn literal(&mut self) -> Result<String, XPathError> {
        self.skip_ws();
        let quote = match self.peek() {
            Some(q @ ('\'' | '"')) => q,
            _ => return Err(self.unexpected()),
        };
        self.pos += 1;
        let rest = self.rest();
        let end = rest.find(quote).ok_or_else(|| self.unexpected())?;
        self.pos += end + 1;
        Ok(rest[..end].to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"<!DOCTYPE html>
<html><head><title>Books</title></head><body>
<div id="nav"><a href="/">Home</a></div>
<ul class="results">
<li class="item"><h2>Dune</h2><a href="/b/1" class="rating-45">Dune</a><img src="/i/1.jpg"></li>
<li class="item featured"><h2>Emma</h2><a href="/b/2" class="rating-30">Emma</a></li>
<li class="item"><h2>Ulysses</h2><a href="/b/3">Ulysses</a><img src="/i/3.jpg"></li>
</ul>
<div><div><p>outer-inner</p></div><p>outer</p></div>
</body></html>"#;

    fn doc() -> Html {
        Html::parse_document(LISTING)
    }

    fn texts(nodes: &[ElementRef<'_>]) -> Vec<String> {
        nodes.iter().map(|n| n.text().collect()).collect()
    }

    #[test]
    fn test_absolute_positional_path() {
        let doc = doc();
        let xp = XPath::parse("/html[1]/body[1]/ul[1]/li[2]/h2[1]").unwrap();
        assert_eq!(texts(&xp.select(&doc)), vec!["Emma"]);
    }

    #[test]
    fn test_descendant_with_attribute_predicate() {
        let doc = doc();
        let xp = XPath::parse("//ul[@class='results']/li").unwrap();
        assert_eq!(xp.select(&doc).len(), 3);
    }

    #[test]
    fn test_contains_predicate() {
        let doc = doc();
        let xp = XPath::parse("//li[contains(@class, 'featured')]/h2").unwrap();
        assert_eq!(texts(&xp.select(&doc)), vec!["Emma"]);
    }

    #[test]
    fn test_has_attribute_and_last() {
        let doc = doc();
        let with_class = XPath::parse("//li/a[@class]").unwrap();
        assert_eq!(with_class.select(&doc).len(), 2);

        let last = XPath::parse("//ul/li[last()]/h2").unwrap();
        assert_eq!(texts(&last.select(&doc)), vec!["Ulysses"]);
    }

    #[test]
    fn test_position_is_per_parent() {
        let doc = doc();
        // Every li's first img, not the first img in the document.
        let xp = XPath::parse("//li/img[1]").unwrap();
        assert_eq!(xp.select(&doc).len(), 2);
    }

    #[test]
    fn test_descendant_results_in_document_order() {
        let doc = doc();
        let xp = XPath::parse("//div/p").unwrap();
        assert_eq!(texts(&xp.select(&doc)), vec!["outer-inner", "outer"]);
    }

    #[test]
    fn test_text_predicate_and_parent_step() {
        let doc = doc();
        let xp = XPath::parse("//h2[text()='Ulysses']/../a").unwrap();
        let found = xp.select(&doc);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].value().attr("href"), Some("/b/3"));
    }

    #[test]
    fn test_relative_start_and_wildcard() {
        let doc = doc();
        let xp = XPath::parse("html/body/*").unwrap();
        assert_eq!(xp.select(&doc).len(), 3);
    }

    #[test]
    fn test_self_step() {
        let doc = doc();
        let xp = XPath::parse("//li[2]/.").unwrap();
        assert_eq!(xp.select(&doc).len(), 1);
    }

    #[test]
    fn test_case_insensitive_names() {
        let doc = doc();
        let xp = XPath::parse("/HTML/BODY/UL/LI[@CLASS='item']").unwrap();
        assert_eq!(xp.select(&doc).len(), 2);
    }

    #[test]
    fn test_no_match() {
        let doc = doc();
        let xp = XPath::parse("//table/tr").unwrap();
        assert!(xp.select(&doc).is_empty());
        assert!(xp.select_first(&doc).is_none());
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(XPath::parse("  "), Err(XPathError::Empty));
        assert!(matches!(XPath::parse("//li["), Err(XPathError::Unexpected { .. })));
        assert!(matches!(XPath::parse("//li[@class='x"), Err(XPathError::Unexpected { .. })));
        assert!(matches!(XPath::parse("/ul/li[0]"), Err(XPathError::ZeroPosition(_))));
        assert!(matches!(XPath::parse("/ul/li)"), Err(XPathError::Unexpected { .. })));
        assert!(matches!(XPath::parse("/ul/"), Err(XPathError::Unexpected { .. })));
        assert!(matches!(XPath::parse("//.."), Err(XPathError::Unexpected { .. })));
    }

    #[test]
    fn test_display_round_trips_source() {
        let xp: XPath = " //ul/li ".parse().unwrap();
        assert_eq!(xp.to_string(), "//ul/li");
        assert_eq!(xp.as_str(), "//ul/li");
    }

    #[test]
    fn test_select_from_element() {
        let doc = doc();
        let second = XPath::parse("//li[2]").unwrap().select_first(&doc).unwrap();

        let child = XPath::parse_relative("/a[1]").unwrap().unwrap();
        let found = child.select_first_from(&doc, second).unwrap();
        assert_eq!(found.value().attr("href"), Some("/b/2"));

        let anywhere = XPath::parse_relative("//a").unwrap().unwrap();
        assert_eq!(anywhere.select_from(&doc, second).len(), 1);
    }

    #[test]
    fn test_parse_relative() {
        assert_eq!(XPath::parse_relative("  ").unwrap(), None);
        assert_eq!(XPath::parse_relative("/h2[1]").unwrap().unwrap().as_str(), "/h2[1]");
        assert!(matches!(XPath::parse_relative("h2"), Err(XPathError::Unexpected { offset: 0, .. })));
        assert!(XPath::parse_relative("/h2[").is_err());
    }

    #[test]
    fn test_locate_selects_element_again() {
        let doc = doc();
        for element in XPath::parse("//li").unwrap().select(&doc) {
            let locator = XPath::locate(element);
            assert_eq!(XPath::parse(locator.as_str()).unwrap(), locator);
            let again = locator.select(&doc);
            assert_eq!(again.len(), 1);
            assert_eq!(again[0].id(), element.id());
        }
    }
}
