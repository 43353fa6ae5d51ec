use chatwire::core::budget;
use chatwire::core::message::Message;
use chatwire::core::sse::{classify_line, SseLine};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

fn make_stream(n_deltas: usize) -> Vec<String> {
    let mut lines = Vec::with_capacity(n_deltas * 2 + 2);
    for i in 0..n_deltas {
        lines.push("event: response.output_text.delta".to_string());
        lines.push(format!(
            r#"data: {{"type":"response.output_text.delta","delta":"token {i} "}}"#
        ));
        lines.push(String::new());
    }
    lines.push(r#"data: {"type":"response.completed","response":{"output_text":"done"}}"#.into());
    lines.push("data: [DONE]".into());
    lines
}

fn make_transcript(n_pairs: usize, base: &str) -> Vec<Message> {
    let mut v = Vec::with_capacity(n_pairs * 2);
    for _ in 0..n_pairs {
        v.push(Message::user(base));
        v.push(Message::assistant(base));
    }
    v
}

fn bench_classify(c: &mut Criterion) {
    let mut group = c.benchmark_group("sse_classify");
    for &n in &[100usize, 1000usize] {
        let lines = make_stream(n);
        group.throughput(Throughput::Elements(lines.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &lines, |b, lines| {
            b.iter(|| {
                lines
                    .iter()
                    .filter(|line| matches!(classify_line(line), SseLine::Event(_)))
                    .count()
            })
        });
    }
    group.finish();
}

fn bench_estimate(c: &mut Criterion) {
    let base = "the check engine light came on after I filled up with gas this morning";
    let context = vec![Message::system("You are a helpful automotive assistant.")];
    let mut group = c.benchmark_group("budget_estimate");
    for &pairs in &[100usize, 400usize] {
        let transcript = make_transcript(pairs, base);
        group.throughput(Throughput::Elements(transcript.len() as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(pairs),
            &transcript,
            |b, transcript| b.iter(|| budget::estimate(&context, transcript, base)),
        );
    }
    group.finish();
}

criterion_group!(benches, bench_classify, bench_estimate);
criterion_main!(benches);
