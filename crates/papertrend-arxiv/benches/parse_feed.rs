use papertrend_arxiv::parser::parse_feed;

/// Synthetic page of `n` entries shaped like an export API response.
fn page(n: usize) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?><feed xmlns="http://www.w3.org/2005/Atom" xmlns:arxiv="http://arxiv.org/schemas/atom" xmlns:opensearch="http://a9.com/-/spec/opensearch/1.1/">"#,
    );
    xml.push_str(&format!("<opensearch:totalResults>{n}</opensearch:totalResults>"));
    for i in 0..n {
        xml.push_str(&format!(
            r#"<entry><id>http://arxiv.org/abs/2601.{i:05}v2</id><updated>2026-01-21T18:00:00Z</updated><published>2026-01-20T09:30:00Z</published><title>Robust learning under distribution shift, part {i}</title><summary>We study invariant risk minimization &amp; related objectives across environments.</summary><author><name>Ada Lovelace</name></author><author><name>Alan Turing</name></author><link href="http://arxiv.org/abs/2601.{i:05}v2" rel="alternate" type="text/html"/><link title="pdf" href="http://arxiv.org/pdf/2601.{i:05}v2" rel="related" type="application/pdf"/><arxiv:primary_category term="cs.LG"/><category term="cs.LG"/><category term="stat.ML"/></entry>"#
        ));
    }
    xml.push_str("</feed>");
    xml
}

#[divan::bench(args = [10, 100])]
fn parse_feed_bench(bencher: divan::Bencher, n: usize) {
    let xml = page(n);
    bencher.bench(|| parse_feed(&xml));
}

fn main() {
    divan::main();
}
