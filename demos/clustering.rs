//! K-means, kernel k-means and agglomerative clustering over 2D CSV datasets.
//!
//! ```text
//! cargo run --example clustering -- <dataset_dir> [dataset.csv ...]
//! ```
//!
//! Each CSV row is `index,x,y,label`. The number of clusters is the number of
//! distinct labels (3 if there are fewer than two). Without arguments the demo
//! clusters a small built-in dataset.
//!
//! Cluster colors come from `CLUSTER_PALETTE` (comma-separated names), falling
//! back to a default palette.

use std::collections::HashMap;
use std::env;
use std::error::Error;
use std::path::Path;

use csv::ReaderBuilder;
use env_logger::Env;
use lloyd::{Dataset, HierarchicalClustering, KernelKmeans, Kmeans, LabeledDataset};

const DEFAULT_DATASETS: [&str; 6] = [
    "dataset0.csv",
    "dataset1.csv",
    "dataset2.csv",
    "dataset3.csv",
    "dataset4.csv",
    "dataset5.csv",
];

const DEFAULT_PALETTE: [&str; 8] = [
    "black", "red", "blue", "green", "cyan", "yellow", "brown", "magenta",
];

fn palette() -> Vec<String> {
    match env::var("CLUSTER_PALETTE") {
        Ok(names) if !names.trim().is_empty() => {
            names.split(',').map(|s| s.trim().to_string()).collect()
        }
        _ => DEFAULT_PALETTE.iter().map(|s| s.to_string()).collect(),
    }
}

/// Read `index,x,y,label` rows. A non-numeric first row is taken as a header.
fn read_dataset(path: &Path) -> Result<LabeledDataset, Box<dyn Error>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let mut rows = Vec::new();
    let mut raw_labels = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        if record.len() < 4 {
            return Err(format!("{}: row {line} has {} fields", path.display(), record.len()).into());
        }
        let parsed: Result<Vec<f64>, _> = (1..4).map(|i| record[i].parse::<f64>()).collect();
        match parsed {
            Ok(v) => {
                rows.push(vec![v[0] as f32, v[1] as f32]);
                raw_labels.push(v[2]);
            }
            Err(_) if line == 0 => continue,
            Err(e) => return Err(format!("{}: row {line}: {e}", path.display()).into()),
        }
    }

    Ok(LabeledDataset::new(Dataset::new(&rows)?, label_ids(&raw_labels))?)
}

/// Dense ids for labels, one per distinct value (`0.5` and `0.7` stay apart).
fn label_ids(raw: &[f64]) -> Vec<i64> {
    let mut ids: HashMap<u64, i64> = HashMap::new();
    raw.iter()
        .map(|&v| {
            // -0.0 and 0.0 are the same label.
            let key = if v == 0.0 { 0 } else { v.to_bits() };
            let next = ids.len() as i64;
            *ids.entry(key).or_insert(next)
        })
        .collect()
}

fn builtin_dataset() -> LabeledDataset {
    let rows: Vec<Vec<f32>> = vec![
        // Cluster A (near origin)
        vec![0.0, 0.0],
        vec![0.1, 0.2],
        vec![0.2, 0.1],
        vec![-0.1, 0.1],
        // Cluster B (near (5, 5))
        vec![5.0, 5.0],
        vec![5.1, 4.9],
        vec![4.9, 5.1],
        vec![5.2, 5.2],
        // Cluster C (near (10, 0))
        vec![10.0, 0.0],
        vec![10.1, 0.1],
        vec![9.9, -0.1],
        vec![10.2, 0.2],
    ];
    let labels = vec![0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2];
    let data = Dataset::new(&rows).expect("built-in dataset is valid");
    LabeledDataset::new(data, labels).expect("one label per row")
}

fn print_groups(title: &str, data: &Dataset, groups: &[Vec<usize>], palette: &[String]) {
    println!("=== {title} ===");
    for (cluster, members) in groups.iter().enumerate() {
        let color = &palette[cluster % palette.len()];
        println!("  cluster {cluster} [{color}]: {} points", members.len());
        for &i in members.iter().take(5) {
            let p = data.row(i);
            println!("    ({:7.3}, {:7.3})", p[0], p[1]);
        }
        if members.len() > 5 {
            println!("    ...");
        }
    }
}

fn run(name: &str, labeled: &LabeledDataset, palette: &[String]) -> Result<(), Box<dyn Error>> {
    let data = labeled.data();
    let k = labeled.suggested_num_clusters().min(data.len());
    println!(
        "{name}\nNum samples: {} num features: {} num clusters: {k}",
        data.len(),
        data.dim()
    );

    let fit = Kmeans::new(k).with_seed(42).fit_dataset(data)?;
    println!(
        "k-means: {:?} after {} iterations, inertia {:.4}",
        fit.status, fit.iterations, fit.inertia
    );
    print_groups("K-Means", data, &fit.state.groups(), palette);

    let kernel = KernelKmeans::new(k).with_gamma(0.1).with_seed(42).fit_dataset(data)?;
    println!("kernel k-means: {:?} after {} iterations", kernel.status, kernel.iterations);
    print_groups("Kernel K-Means", data, &kernel.groups(), palette);

    let aggl = HierarchicalClustering::new(k).fit_dataset(data)?;
    print_groups("Agglomerative clustering", data, &aggl.groups(), palette);
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init_from_env(Env::default().filter_or("RUST_LOG", "info"));

    let palette = palette();
    let args: Vec<String> = env::args().skip(1).collect();

    let Some(dir) = args.first() else {
        return run("built-in", &builtin_dataset(), &palette);
    };

    let base = Path::new(dir);
    if !base.is_dir() {
        return Err(format!("invalid dataset path: {}", base.display()).into());
    }

    let names: Vec<&str> = if args.len() > 1 {
        args[1..].iter().map(String::as_str).collect()
    } else {
        DEFAULT_DATASETS.to_vec()
    };

    for name in names {
        let path = base.join(name);
        if !path.exists() {
            eprintln!("File not found: {}", path.display());
            continue;
        }
        let labeled = read_dataset(&path)?;
        run(name, &labeled, &palette)?;
    }
    Ok(())
}
