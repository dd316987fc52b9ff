use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use football_api::cleaner::{clean_season_csv, normalize_fields};
use football_api::match_query::{MatchFilter, MatchQuery};

fn sample_season(rows: usize) -> String {
    let teams = [
        "Espanol", "Sevilla", "La Coruna", "Villareal", "Betis", "Celta", "Getafe", "Logrones",
    ];
    let results = ["H", "D", "A"];
    let mut out = String::from("Div,Date,HomeTeam,AwayTeam,FTHG,FTAG,FTR\n");
    for idx in 0..rows {
        let home = teams[idx % teams.len()];
        let away = teams[(idx + 3) % teams.len()];
        let ftr = results[idx % results.len()];
        out.push_str(&format!(
            "SP1,{:02}/{:02}/2019,{home},{away},1,1,{ftr}\n",
            idx % 28 + 1,
            idx % 12 + 1
        ));
    }
    out
}

fn bench_normalize_fields(c: &mut Criterion) {
    c.bench_function("normalize_fields", |b| {
        b.iter(|| {
            let row = normalize_fields(black_box(["17/08/2019", "Espanol", "Sevilla", "A"]));
            black_box(row);
        })
    });
}

fn bench_clean_season(c: &mut Criterion) {
    let text = sample_season(380);
    c.bench_function("clean_season_csv_380_rows", |b| {
        b.iter(|| {
            let season = clean_season_csv(black_box(&text)).unwrap();
            black_box(season.rows.len());
        })
    });
}

fn bench_filter_build(c: &mut Criterion) {
    let query = MatchQuery {
        date: None,
        season: Some("2019/2020".to_string()),
        team: Some("Real Madrid".to_string()),
        home: None,
    };
    c.bench_function("match_filter_where_clause", |b| {
        b.iter(|| {
            let filter = MatchFilter::from_query(black_box(&query)).unwrap();
            black_box(filter.where_clause());
        })
    });
}

criterion_group!(
    benches,
    bench_normalize_fields,
    bench_clean_season,
    bench_filter_build
);
criterion_main!(benches);
