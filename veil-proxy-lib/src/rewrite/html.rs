use std::cell::{Cell, RefCell};
use std::rc::Rc;

use lol_html::html_content::{ContentType, EndTag};
use lol_html::{element, end, text, HtmlRewriter, Settings};

use crate::rewrite::{css, js, RewriteError};
use crate::script::{self, reinforcement_script};
use crate::translate::{to_proxied, RewriteContext};

/// Attributes carrying a single URL on any element
pub const URL_ATTRIBUTES: &[&str] = &["src", "href", "action", "data-src", "data-href", "poster", "background"];

/// Rewrite an HTML document.
///
/// Every existing `<base>` is removed and a canonical one is prepended to
/// `<head>`. The reinforcement script goes before `</head>`, else before
/// `</body>`, else at the end of the document, unless the document already
/// carries [`script::MARKER`].
pub fn rewrite_html(html: &str, ctx: &RewriteContext, inject_script: bool) -> Result<String, RewriteError> {
    let inject = inject_script && !script::is_injected(html);
    let base_tag = format!(r#"<base href="{}">"#, escape_attr(&ctx.reference().base_href()));
    let script_tag = reinforcement_script(ctx);

    let base_done = Cell::new(false);
    let script_done = Rc::new(Cell::new(!inject));
    let skip_script = Cell::new(false);
    let script_buf = RefCell::new(String::new());
    let style_buf = RefCell::new(String::new());

    let mut output = Vec::with_capacity(html.len() + script_tag.len() + base_tag.len());
    let mut rewriter = HtmlRewriter::new(
        Settings {
            element_content_handlers: vec![
                element!("base", |el| {
                    el.remove();
                    Ok(())
                }),
                element!("*", |el| {
                    for name in URL_ATTRIBUTES {
                        if let Some(value) = el.get_attribute(name) {
                            let proxied = to_proxied(&value, ctx);
                            if proxied != value {
                                el.set_attribute(name, &proxied)?;
                            }
                        }
                    }
                    if let Some(srcset) = el.get_attribute("srcset") {
                        let rewritten = rewrite_srcset(&srcset, ctx);
                        if rewritten != srcset {
                            el.set_attribute("srcset", &rewritten)?;
                        }
                    }
                    if let Some(style) = el.get_attribute("style") {
                        let rewritten = css::rewrite_css(&style, ctx);
                        if rewritten != style {
                            el.set_attribute("style", &rewritten)?;
                        }
                    }
                    Ok(())
                }),
                element!("head", |el| {
                    if !base_done.get() {
                        el.prepend(&base_tag, ContentType::Html);
                        base_done.set(true);
                    }
                    if !script_done.get() {
                        if let Some(handlers) = el.end_tag_handlers() {
                            handlers.push(Box::new(script_before_end(&script_done, &script_tag)));
                        }
                    }
                    Ok(())
                }),
                element!("body", |el| {
                    if !script_done.get() {
                        if let Some(handlers) = el.end_tag_handlers() {
                            handlers.push(Box::new(script_before_end(&script_done, &script_tag)));
                        }
                    }
                    Ok(())
                }),
                element!("script", |el| {
                    skip_script.set(el.has_attribute(script::INJECTED_ATTR));
                    Ok(())
                }),
                text!("script", |t| {
                    script_buf.borrow_mut().push_str(t.as_str());
                    if !t.last_in_text_node() {
                        t.remove();
                        return Ok(());
                    }
                    let source = script_buf.take();
                    let rewritten = if skip_script.get() { source } else { js::rewrite_js(&source, ctx) };
                    t.replace(&rewritten, ContentType::Html);
                    Ok(())
                }),
                text!("style", |t| {
                    style_buf.borrow_mut().push_str(t.as_str());
                    if !t.last_in_text_node() {
                        t.remove();
                        return Ok(());
                    }
                    let source = style_buf.take();
                    t.replace(&css::rewrite_css(&source, ctx), ContentType::Html);
                    Ok(())
                }),
            ],
            document_content_handlers: vec![end!(|end| {
                if !base_done.get() {
                    end.append(&base_tag, ContentType::Html);
                    base_done.set(true);
                }
                if !script_done.get() {
                    end.append(&script_tag, ContentType::Html);
                    script_done.set(true);
                }
                Ok(())
            })],
            ..Settings::default()
        },
        |chunk: &[u8]| output.extend_from_slice(chunk),
    );

    rewriter
        .write(html.as_bytes())
        .map_err(|e| RewriteError::Html(e.to_string()))?;
    rewriter.end().map_err(|e| RewriteError::Html(e.to_string()))?;

    String::from_utf8(output).map_err(|e| RewriteError::Html(e.to_string()))
}

// End tag handlers outlive the rewriter borrow, so they own their state
fn script_before_end(
    script_done: &Rc<Cell<bool>>,
    script_tag: &str,
) -> impl FnOnce(&mut EndTag<'_>) -> lol_html::HandlerResult + 'static {
    let script_done = script_done.clone();
    let script_tag = script_tag.to_string();
    move |end: &mut EndTag<'_>| {
        if !script_done.get() {
            end.before(&script_tag, ContentType::Html);
            script_done.set(true);
        }
        Ok(())
    }
}

/// Rewrite each `srcset` candidate URL, keeping its descriptor.
///
/// A candidate URL runs to the next whitespace and may itself contain
/// commas; a comma separates candidates only after the descriptor or when
/// it ends the URL.
pub fn rewrite_srcset(srcset: &str, ctx: &RewriteContext) -> String {
    let mut candidates = Vec::new();
    let mut rest = srcset;
    loop {
        rest = rest.trim_start_matches(|c: char| c.is_whitespace() || c == ',');
        if rest.is_empty() {
            break;
        }
        let url_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let (raw_url, after) = rest.split_at(url_end);
        let url = raw_url.trim_end_matches(',');
        if url.len() < raw_url.len() {
            candidates.push(to_proxied(url, ctx));
            rest = after;
            continue;
        }
        let descriptor_end = after.find(',').unwrap_or(after.len());
        let descriptor = after[..descriptor_end].trim();
        if descriptor.is_empty() {
            candidates.push(to_proxied(url, ctx));
        } else {
            candidates.push(format!("{} {descriptor}", to_proxied(url, ctx)));
        }
        rest = &after[descriptor_end..];
    }
    candidates.join(", ")
}

fn escape_attr(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}
