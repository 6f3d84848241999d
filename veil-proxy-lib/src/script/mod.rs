//! Client-side reinforcement script.
//!
//! The script carries a JavaScript `toProxied` that mirrors
//! [`crate::translate::to_proxied`] and routes URLs created at runtime
//! (fetch, XHR, beacons, popups, history, attribute writes, forms and
//! dynamically inserted nodes) through the proxy.

use crate::rewrite::html::URL_ATTRIBUTES;
use crate::translate::{RewriteContext, PROXY_PREFIX};

/// Comment placed in front of the injected script. A document that already
/// contains it is never injected twice.
pub const MARKER: &str = "<!-- veil-proxy:reinforcement -->";

/// Attribute set on the injected `<script>`; its body is never rewritten
pub const INJECTED_ATTR: &str = "data-veil-proxy";

const TEMPLATE: &str = r##"(function () {
  if (window.__veilProxy) { return; }
  var PROXY_BASE = __VEIL_BASE__;
  var TARGET = __VEIL_TARGET__;
  var PREFIX = __VEIL_PREFIX__;
  var URL_ATTRS = __VEIL_ATTRS__;
  var CANONICAL = (PROXY_BASE + PREFIX).toLowerCase();
  var SKIP = /^(data|blob|javascript|mailto|tel|about):/i;
  var SCHEME = /^([a-z][a-z0-9+.\-]*):/i;

  function hostKey(u) {
    return u.protocol === "http:" ? "http://" + u.host : u.host;
  }

  function toProxied(raw) {
    if (raw === null || raw === undefined) { return raw; }
    var s = String(raw).trim();
    if (!s || s.charAt(0) === "#" || SKIP.test(s)) { return raw; }
    if (s.indexOf(PREFIX) === 0 || s.toLowerCase().indexOf(CANONICAL) === 0) { return raw; }
    var m = SCHEME.exec(s);
    if (m && !/^https?$/i.test(m[1])) { return raw; }
    try {
      if (s.indexOf("//") === 0) {
        var full = new URL(TARGET).protocol + s;
        if (full.toLowerCase().indexOf(CANONICAL) === 0) { return raw; }
      }
      var u = new URL(s, TARGET);
      if (u.protocol !== "http:" && u.protocol !== "https:") { return raw; }
      return PROXY_BASE + PREFIX + hostKey(u) + u.pathname + u.search + u.hash;
    } catch (e) {
      return raw;
    }
  }

  function isUrlAttr(name) {
    return URL_ATTRS.indexOf(String(name).toLowerCase()) !== -1;
  }

  var nativeSetAttribute = Element.prototype.setAttribute;

  function fixElement(el) {
    if (!el || el.nodeType !== 1) { return; }
    for (var i = 0; i < URL_ATTRS.length; i++) {
      var name = URL_ATTRS[i];
      var value = el.getAttribute(name);
      if (value === null) { continue; }
      var next = toProxied(value);
      if (next !== value) { nativeSetAttribute.call(el, name, next); }
    }
    var srcset = el.getAttribute("srcset");
    if (srcset) {
      var rewritten = rewriteSrcset(srcset);
      if (rewritten !== srcset) { nativeSetAttribute.call(el, "srcset", rewritten); }
    }
  }

  // A candidate URL runs to the next whitespace; a comma only separates
  // candidates after the descriptor or at the very end of the URL.
  function rewriteSrcset(srcset) {
    var out = [];
    var i = 0;
    var n = srcset.length;
    while (i < n) {
      while (i < n && /[\s,]/.test(srcset.charAt(i))) { i++; }
      if (i >= n) { break; }
      var start = i;
      while (i < n && !/\s/.test(srcset.charAt(i))) { i++; }
      var url = srcset.slice(start, i);
      var bare = url.replace(/,+$/, "");
      if (bare.length < url.length) {
        out.push(toProxied(bare));
        continue;
      }
      var end = srcset.indexOf(",", i);
      if (end === -1) { end = n; }
      var descriptor = srcset.slice(i, end).trim();
      out.push(descriptor ? toProxied(url) + " " + descriptor : toProxied(url));
      i = end;
    }
    return out.join(", ");
  }

  if (window.fetch) {
    var nativeFetch = window.fetch;
    window.fetch = function (input, init) {
      if (typeof input === "string" || input instanceof URL) {
        input = toProxied(String(input));
      } else if (input && input.url) {
        input = new Request(toProxied(input.url), input);
      }
      return nativeFetch.call(this, input, init);
    };
  }

  var nativeOpen = XMLHttpRequest.prototype.open;
  XMLHttpRequest.prototype.open = function (method, url) {
    var args = Array.prototype.slice.call(arguments);
    args[1] = toProxied(url);
    return nativeOpen.apply(this, args);
  };

  if (navigator.sendBeacon) {
    var nativeBeacon = navigator.sendBeacon.bind(navigator);
    navigator.sendBeacon = function (url, data) {
      return nativeBeacon(toProxied(url), data);
    };
  }

  var nativeWindowOpen = window.open;
  window.open = function (url) {
    var args = Array.prototype.slice.call(arguments);
    if (url) { args[0] = toProxied(String(url)); }
    return nativeWindowOpen.apply(window, args);
  };

  ["pushState", "replaceState"].forEach(function (name) {
    var native = history[name];
    history[name] = function (state, title, url) {
      if (url !== undefined && url !== null) { url = toProxied(String(url)); }
      return native.call(history, state, title, url);
    };
  });

  Element.prototype.setAttribute = function (name, value) {
    if (isUrlAttr(name)) { value = toProxied(value); }
    return nativeSetAttribute.call(this, name, value);
  };

  document.addEventListener("submit", function (event) {
    var form = event.target;
    if (form && form.getAttribute) {
      var action = form.getAttribute("action");
      var next = toProxied(action === null ? TARGET : action);
      if (next !== action) { nativeSetAttribute.call(form, "action", next); }
    }
  }, true);

  if (window.MutationObserver) {
    new MutationObserver(function (records) {
      records.forEach(function (record) {
        if (record.type === "attributes") {
          fixElement(record.target);
          return;
        }
        record.addedNodes.forEach(function (node) {
          fixElement(node);
          if (node.querySelectorAll) {
            node.querySelectorAll("*").forEach(fixElement);
          }
        });
      });
    }).observe(document.documentElement, {
      childList: true,
      subtree: true,
      attributes: true,
      attributeFilter: URL_ATTRS.concat(["srcset"])
    });
  }

  window.__veilProxy = { toProxied: toProxied, target: TARGET };
})();"##;

/// Build the marker comment plus `<script>` element for a page.
pub fn reinforcement_script(ctx: &RewriteContext) -> String {
    let script = TEMPLATE
        .replace("__VEIL_BASE__", &js_string(ctx.proxy_base()))
        .replace("__VEIL_TARGET__", &js_string(ctx.target_url().as_str()))
        .replace("__VEIL_PREFIX__", &js_string(PROXY_PREFIX))
        .replace("__VEIL_ATTRS__", &js_array(URL_ATTRIBUTES));
    format!("{MARKER}<script {INJECTED_ATTR}>{script}</script>")
}

/// True when the document already carries an injected script
pub fn is_injected(body: &str) -> bool {
    body.contains(MARKER)
}

// JSON literal safe to embed in a <script> element
fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string())
        .to_string()
        .replace("</", "<\\/")
}

fn js_array(values: &[&str]) -> String {
    serde_json::Value::from(values.to_vec()).to_string()
}
