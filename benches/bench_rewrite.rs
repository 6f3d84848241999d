//! Micro benchmarks for the content rewrite pipeline and the URL translator.
//! Pure CPU - no network, no IO.
//!
//! ```bash
//! cargo bench --bench bench_rewrite
//! ```

use bytes::Bytes;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use veil_proxy_lib::rewrite::{ContentKind, RewritePipeline};
use veil_proxy_lib::translate::{to_original, to_proxied, RewriteContext};

const PROXY_BASE: &str = "http://localhost:3000";
const TARGET: &str = "https://example.com/articles/index.html";

fn html_page(links: usize) -> String {
    let mut page = String::from(
        "<!DOCTYPE html><html><head><title>bench</title>\
         <link rel=\"stylesheet\" href=\"/static/site.css\">\
         <style>body { background: url('/img/bg.png') }</style></head><body>",
    );
    for i in 0..links {
        page.push_str(&format!(
            "<a href=\"/articles/{i}\">article {i}</a>\
             <img src=\"https://cdn.example.com/{i}.png\" srcset=\"/{i}-1x.png 1x, /{i}-2x.png 2x\">"
        ));
    }
    page.push_str("<script>fetch('https://api.example.com/feed')</script></body></html>");
    page
}

fn bench_html_rewrite(c: &mut Criterion) {
    let ctx = match RewriteContext::for_target(PROXY_BASE, TARGET) {
        Some(ctx) => ctx,
        None => panic!("benchmark target must be a valid URL"),
    };
    let pipeline = RewritePipeline::default();

    let mut group = c.benchmark_group("html_rewrite");
    for links in [10usize, 100, 1000] {
        let body = Bytes::from(html_page(links));
        group.throughput(Throughput::Bytes(body.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(links), &body, |b, body| {
            b.iter(|| pipeline.try_rewrite(std::hint::black_box(body), ContentKind::Html, &ctx));
        });
    }
    group.finish();
}

fn bench_translate(c: &mut Criterion) {
    let ctx = match RewriteContext::for_target(PROXY_BASE, TARGET) {
        Some(ctx) => ctx,
        None => panic!("benchmark target must be a valid URL"),
    };

    c.bench_function("to_proxied_relative", |b| {
        b.iter(|| to_proxied(std::hint::black_box("../img/logo.png?v=2"), &ctx));
    });
    c.bench_function("to_proxied_absolute", |b| {
        b.iter(|| to_proxied(std::hint::black_box("https://cdn.example.com/a.js"), &ctx));
    });
    c.bench_function("to_original", |b| {
        b.iter(|| to_original(std::hint::black_box("http://localhost:3000/proxy/example.com/a/b?c=d")));
    });
}

criterion_group!(rewrite_benches, bench_html_rewrite, bench_translate);
criterion_main!(rewrite_benches);
