//! A small owned element tree over `quick-xml` events.
//!
//! Manifests are a few hundred kilobytes at most and are read through fixed
//! element paths, so building a tree is simpler than a streaming state
//! machine. Namespace prefixes are dropped; elements are matched on their
//! local name.

use quick_xml::{Reader, events::Event};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
  pub name:     String,
  text:         String,
  pub children: Vec<Element>,
}

impl Element {
  /// Parse a complete document and return its root element.
  pub fn parse(xml: &[u8]) -> Result<Element> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().check_end_names = true;

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;
    let mut buf = Vec::new();

    loop {
      match reader.read_event_into(&mut buf)? {
        Event::Start(e) => {
          if root.is_some() {
            return Err(Error::Xml("content after the root element".into()));
          }
          stack.push(Element {
            name: local_name(e.name().as_ref()),
            ..Element::default()
          });
        }
        Event::Empty(e) => {
          let element = Element {
            name: local_name(e.name().as_ref()),
            ..Element::default()
          };
          attach(&mut stack, &mut root, element)?;
        }
        Event::Text(t) => {
          if let Some(top) = stack.last_mut() {
            top.text.push_str(&t.unescape()?);
          } else if !t.unescape()?.trim().is_empty() {
            return Err(Error::Xml("text outside the root element".into()));
          }
        }
        Event::CData(c) => {
          if let Some(top) = stack.last_mut() {
            top.text.push_str(&String::from_utf8_lossy(&c.into_inner()));
          }
        }
        Event::End(_) => {
          let element = stack
            .pop()
            .ok_or_else(|| Error::Xml("unbalanced end tag".into()))?;
          attach(&mut stack, &mut root, element)?;
        }
        Event::Eof => break,
        _ => {}
      }
      buf.clear();
    }

    if let Some(open) = stack.last() {
      return Err(Error::Xml(format!("unclosed element <{}>", open.name)));
    }
    root.ok_or_else(|| Error::Xml("document has no root element".into()))
  }

  /// Trimmed text content, or `None` when blank.
  pub fn text(&self) -> Option<&str> {
    Some(self.text.trim()).filter(|s| !s.is_empty())
  }

  /// First descendant reached by a `/`-separated path of child names.
  pub fn find(&self, path: &str) -> Option<&Element> {
    let mut current = self;
    for segment in segments(path) {
      current = current.children.iter().find(|c| c.name == segment)?;
    }
    Some(current)
  }

  /// Every descendant reached by a `/`-separated path, in document order.
  pub fn find_all<'a>(&'a self, path: &str) -> Vec<&'a Element> {
    let mut current: Vec<&Element> = vec![self];
    for segment in segments(path) {
      current = current
        .into_iter()
        .flat_map(|e| e.children.iter().filter(move |c| c.name == segment))
        .collect();
    }
    current
  }

  /// Text of the element at `path`, or `None` when missing or blank.
  pub fn text_at(&self, path: &str) -> Option<&str> {
    self.find(path).and_then(Element::text)
  }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
  path
    .trim_start_matches("./")
    .split('/')
    .filter(|s| !s.is_empty() && *s != ".")
}

fn attach(
  stack: &mut [Element],
  root: &mut Option<Element>,
  element: Element,
) -> Result<()> {
  match stack.last_mut() {
    Some(parent) => parent.children.push(element),
    None if root.is_none() => *root = Some(element),
    None => return Err(Error::Xml("content after the root element".into())),
  }
  Ok(())
}

/// Strip a `prefix:` from a qualified name.
fn local_name(name: &[u8]) -> String {
  let local = match name.iter().rposition(|&b| b == b':') {
    Some(pos) => &name[pos + 1..],
    None => name,
  };
  String::from_utf8_lossy(local).into_owned()
}

#[cfg(test)]
mod tests {
  use super::*;

  const DOC: &str = r#"<?xml version="1.0"?>
    <m:Root xmlns:m="urn:test">
      <A><B>  one  </B><B>two</B></A>
      <A><B>three</B><C/></A>
      <D><![CDATA[raw & text]]></D>
      <E>fish &amp; chips</E>
    </m:Root>"#;

  #[test]
  fn navigates_paths() {
    let root = Element::parse(DOC.as_bytes()).unwrap();
    assert_eq!(root.name, "Root");
    assert_eq!(root.text_at("A/B"), Some("one"));
    assert_eq!(root.text_at("./A/B"), Some("one"));
    let all: Vec<_> = root
      .find_all("A/B")
      .into_iter()
      .filter_map(Element::text)
      .collect();
    assert_eq!(all, vec!["one", "two", "three"]);
    assert!(root.find("A/C").is_none(), "find follows the first A only");
    assert_eq!(root.find_all("A/C").len(), 1);
    assert_eq!(root.text_at("D"), Some("raw & text"));
    assert_eq!(root.text_at("E"), Some("fish & chips"));
    assert_eq!(root.text_at("Missing/Path"), None);
  }

  #[test]
  fn rejects_mismatched_tags() {
    assert!(Element::parse(b"<a><b></a></b>").is_err());
  }

  #[test]
  fn rejects_truncated_document() {
    assert!(Element::parse(b"<a><b>text</b>").is_err());
  }

  #[test]
  fn rejects_empty_document() {
    assert!(Element::parse(b"").is_err());
    assert!(Element::parse(b"   ").is_err());
  }

  #[test]
  fn rejects_second_root() {
    assert!(Element::parse(b"<a/><b/>").is_err());
  }
}
