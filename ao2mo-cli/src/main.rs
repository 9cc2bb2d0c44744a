use std::{fs::File, path::PathBuf, time::Instant};

use anyhow::Context;
use ao2mo::{
    config::{ConfigIntegrals, ConfigOrbitals},
    eri::{restore, AoEri},
    symmetry::AoSymmetry,
    transform::{self, TransformConfig},
};
use clap::{Args as TransformArgs, Parser, Subcommand};
use nalgebra::DMatrix;
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Ao2moCommand,
}

#[derive(Subcommand, Debug)]
enum Ao2moCommand {
    /// Transform (ij|kl) with one orbital set on all four indices
    #[command(name = "full")]
    Full {
        /// Packed AO integrals as JSON: {"nao": .., "data": [..]}
        #[arg(long, short)]
        integrals: PathBuf,
        /// Orbital coefficient matrix as JSON, one row per AO
        #[arg(long, short)]
        orbitals: PathBuf,
        #[command(flatten)]
        options: TransformOptions,
    },
    /// Transform (ij|kl) with four independent orbital sets
    #[command(name = "general")]
    General {
        /// Packed AO integrals as JSON: {"nao": .., "data": [..]}
        #[arg(long, short)]
        integrals: PathBuf,
        /// Four orbital coefficient files, one per index of (ij|kl)
        #[arg(long, short, num_args = 4)]
        orbitals: Vec<PathBuf>,
        #[command(flatten)]
        options: TransformOptions,
    },
    /// Re-pack AO integrals into another storage (s1, s4 or s8)
    #[command(name = "restore")]
    Restore {
        /// Packed AO integrals as JSON: {"nao": .., "data": [..]}
        #[arg(long, short)]
        integrals: PathBuf,
        /// Target packing label
        #[arg(long, short)]
        symmetry: String,
        /// Where to write the re-packed array as JSON
        #[arg(long, short)]
        output: PathBuf,
    },
}

#[derive(TransformArgs, Debug)]
struct TransformOptions {
    /// Where to write the transformed integrals as JSON; omit to only
    /// report the shape and checksum
    #[arg(long)]
    output: Option<PathBuf>,
    /// Abandon permutation symmetry and return the plain MO integrals
    #[arg(long)]
    plain: bool,
    /// AO pairs per block in the contraction loops
    #[arg(long, default_value_t = 56)]
    block_size: usize,
    /// Element-wise tolerance for treating two orbital sets as identical
    #[arg(long, default_value_t = 1e-12)]
    identity_tol: f64,
}

impl TransformOptions {
    fn config(&self) -> TransformConfig {
        TransformConfig {
            block_size: self.block_size,
            identity_tol: self.identity_tol,
        }
    }
}

#[derive(Serialize)]
struct TransformedOutput {
    shape: (usize, usize),
    /// row-major
    data: Vec<f64>,
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let args: Args = Args::parse();

    match args.command {
        Ao2moCommand::Full {
            integrals,
            orbitals,
            options,
        } => {
            let eri = load_integrals(&integrals)?;
            let mo = load_orbitals(&orbitals)?;

            let start = Instant::now();
            let result = transform::full(&eri, &mo, !options.plain, &options.config())?;
            report(&result, start, options.output.as_deref())?;
        }

        Ao2moCommand::General {
            integrals,
            orbitals,
            options,
        } => {
            let eri = load_integrals(&integrals)?;
            let mos = orbitals
                .iter()
                .map(|path| load_orbitals(path))
                .collect::<anyhow::Result<Vec<_>>>()?;
            let [mo_i, mo_j, mo_k, mo_l] = mos.as_slice() else {
                anyhow::bail!("general needs exactly four orbital files");
            };

            let start = Instant::now();
            let result = transform::general(
                &eri,
                (mo_i, mo_j, mo_k, mo_l),
                !options.plain,
                &options.config(),
            )?;
            report(&result, start, options.output.as_deref())?;
        }

        Ao2moCommand::Restore {
            integrals,
            symmetry,
            output,
        } => {
            let eri = load_integrals(&integrals)?;
            let target: AoSymmetry = symmetry.parse()?;
            let data = restore(target, &eri)?;
            println!("re-packed {} elements as {target}", data.len());
            serde_json::to_writer(
                File::create(&output).with_context(|| format!("creating {output:?}"))?,
                &data,
            )?;
        }
    }

    Ok(())
}

fn load_integrals(path: &std::path::Path) -> anyhow::Result<AoEri> {
    let file = File::open(path).with_context(|| format!("opening {path:?}"))?;
    let parsed: ConfigIntegrals = serde_json::from_reader(file)?;
    Ok(AoEri::try_from(parsed)?)
}

fn load_orbitals(path: &std::path::Path) -> anyhow::Result<DMatrix<f64>> {
    let file = File::open(path).with_context(|| format!("opening {path:?}"))?;
    let parsed: ConfigOrbitals = serde_json::from_reader(file)?;
    Ok(DMatrix::try_from(parsed)?)
}

fn report(
    result: &DMatrix<f64>,
    start: Instant,
    output: Option<&std::path::Path>,
) -> anyhow::Result<()> {
    let checksum: f64 = result.iter().map(|value| value.abs()).sum();
    println!(
        "transformed to shape {:?} in {:0.2?}, |eri_mo| sum {checksum:0.12}",
        result.shape(),
        start.elapsed()
    );

    if let Some(path) = output {
        let payload = TransformedOutput {
            shape: result.shape(),
            data: result.transpose().as_slice().to_vec(),
        };
        serde_json::to_writer(
            File::create(path).with_context(|| format!("creating {path:?}"))?,
            &payload,
        )?;
        log::info!("wrote {path:?}");
    }

    Ok(())
}
