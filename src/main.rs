use ancestry::compare::{
    build_model, compare_test_individuals, distances_by_group, Comparer, DifferenceCounter,
    RandomComparer,
};
use ancestry::core::population::{read_population_file, Population};
use ancestry::predict::{Classifier, ClassifierConfig, Strategy};
use ancestry::report::ReportWriter;
use ancestry::utils::{create_spinner, read_identifiers_file};
use ancestry::vcf::{open_vcf, Dispatcher};
use anyhow::{bail, Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::MultiProgress;
use indicatif_log_bridge::LogWrapper;
use log::{info, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Genetic distance and ancestry prediction from VCF files
#[derive(Parser, Debug)]
#[command(author, version, about = "Genetic distance and ancestry prediction from VCF files")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compare every pair of individuals and list the values per pair of groups
    Table(TableArgs),
    /// Summarise distances within and between training groups, and from each
    /// test individual to every training group
    Model(ModelArgs),
    /// Predict the group of individuals from per-variant allele frequencies
    Predict(PredictArgs),
}

#[derive(Args, Debug, Clone)]
pub struct SharedOptions {
    /// Output path for the TSV report. Defaults to stdout
    #[arg(short = 'o', long = "output")]
    pub output: Option<Utf8PathBuf>,

    /// Seed for every random choice made during the run
    #[arg(long = "seed")]
    pub seed: Option<u64>,
}

impl SharedOptions {
    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparerKind {
    /// Count the variants where two individuals carry different alternate alleles
    Default,
    /// Salted pseudo-random values, as a baseline
    Random,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    /// Vote for the closest group when it is closer than the runner-up by t1
    Nearest,
    /// Vote within every pair of groups whose distances differ by t1
    Pairwise,
}

impl From<StrategyKind> for Strategy {
    fn from(kind: StrategyKind) -> Self {
        match kind {
            StrategyKind::Nearest => Strategy::NearestMargin,
            StrategyKind::Pairwise => Strategy::PairwiseMargin,
        }
    }
}

#[derive(Args, Debug)]
pub struct TableArgs {
    /// Path to input VCF file (plain, bgzipped, or - for stdin)
    pub vcf: Utf8PathBuf,

    /// Population file. Whitespace separated: individual group
    pub population: Utf8PathBuf,

    /// Method used to compare two individuals
    #[arg(short = 'c', long = "comparer", value_enum, default_value_t = ComparerKind::Default)]
    pub comparer: ComparerKind,

    #[command(flatten)]
    pub shared: SharedOptions,
}

#[derive(Args, Debug)]
pub struct ModelArgs {
    /// Path to input VCF file (plain, bgzipped, or - for stdin)
    pub vcf: Utf8PathBuf,

    /// Population file of the individuals the model is built from
    pub train: Utf8PathBuf,

    /// Population file of the individuals compared against the model
    pub test: Utf8PathBuf,

    /// Method used to compare two individuals
    #[arg(short = 'c', long = "comparer", value_enum, default_value_t = ComparerKind::Default)]
    pub comparer: ComparerKind,

    #[command(flatten)]
    pub shared: SharedOptions,
}

#[derive(Args, Debug)]
pub struct PredictArgs {
    /// Path to input VCF file (plain, bgzipped, or - for stdin)
    pub vcf: Utf8PathBuf,

    /// Population file of the individuals with known groups. Groups starting
    /// with '?' mark individuals to predict
    pub population: Utf8PathBuf,

    /// Population file of the individuals to predict
    #[arg(short = 'i', long = "individuals")]
    pub individuals: Option<Utf8PathBuf>,

    /// File of variant identifiers to base the prediction on, one per line
    #[arg(short = 'p', long = "polymorphisms")]
    pub polymorphisms: Option<Utf8PathBuf>,

    /// Fraction of the population drawn at random for prediction when no
    /// individuals are marked or given
    #[arg(short = 't', long = "test-fraction", default_value_t = 0.1)]
    pub test_fraction: f64,

    /// Voting strategy
    #[arg(short = 's', long = "strategy", value_enum, default_value_t = StrategyKind::Nearest)]
    pub strategy: StrategyKind,

    /// Distance margin a group must win by to receive a vote
    #[arg(long = "t1", default_value_t = 0.0)]
    pub margin: f64,

    /// Vote gap the top group must win by to be assigned. Relative to the top
    /// count when strictly between 0 and 1
    #[arg(long = "t2", default_value_t = 0.0)]
    pub resolution: f64,

    #[command(flatten)]
    pub shared: SharedOptions,
}

fn build_comparer(
    kind: ComparerKind,
    vcf: &Utf8Path,
    individuals: Vec<String>,
    rng: &mut StdRng,
    multi: &MultiProgress,
) -> Result<Comparer> {
    match kind {
        ComparerKind::Random => Ok(Comparer::Random(RandomComparer::new(rng.gen()))),
        ComparerKind::Default => {
            let reader = open_vcf(vcf)?;
            let spinner = multi.add(create_spinner("Counting differences")?);
            let differences = DifferenceCounter::new(individuals)
                .consume_with(Dispatcher::new(reader).with_progress(spinner.clone()))
                .with_context(|| format!("Failed to process VCF file: {}", vcf))?;
            spinner.finish_with_message("Differences counted");
            Ok(Comparer::Difference(differences))
        }
    }
}

impl TableArgs {
    pub fn run(self, multi: &MultiProgress) -> Result<()> {
        let population = read_population_file(&self.population)?;
        info!("Loaded {}", population);

        let mut rng = self.shared.rng();
        let individuals = population.individuals().map(str::to_string).collect();
        let comparer = build_comparer(self.comparer, &self.vcf, individuals, &mut rng, multi)?;

        let distances = distances_by_group(&population, &comparer)?;
        let mut writer = ReportWriter::create(self.shared.output.as_deref())?;
        writer.write_distances(&distances)?;
        writer.finish()
    }
}

impl ModelArgs {
    pub fn run(self, multi: &MultiProgress) -> Result<()> {
        let train = read_population_file(&self.train)?;
        let test = read_population_file(&self.test)?;
        info!("Loaded {} for training and {} for testing", train, test);

        let mut rng = self.shared.rng();
        let individuals = train
            .individuals()
            .chain(test.individuals())
            .map(str::to_string)
            .collect();
        let comparer = build_comparer(self.comparer, &self.vcf, individuals, &mut rng, multi)?;

        let model = build_model(&train, &comparer)?;
        let summaries = compare_test_individuals(&test, &train, &comparer)?;

        let mut writer = ReportWriter::create(self.shared.output.as_deref())?;
        writer.write_model(&model)?;
        writer.write_test_summaries(&summaries)?;
        writer.finish()
    }
}

impl PredictArgs {
    /// Individuals to predict: the given file, the '?' entries of the
    /// population, or a random fraction of it.
    ///
    /// '?' entries never stay in `population`, even when a file is given.
    fn test_population(&self, population: &mut Population) -> Result<Population> {
        let unknown = population.take_unknown();

        if let Some(ref path) = self.individuals {
            if !unknown.is_empty() {
                info!(
                    "Ignoring {} '?' entries of the population in favour of {}",
                    unknown.len(),
                    path
                );
            }
            return read_population_file(path);
        }

        if !unknown.is_empty() {
            return Ok(unknown);
        }

        if !(0.0..=1.0).contains(&self.test_fraction) {
            bail!(
                "Test fraction must be between 0 and 1, got {}",
                self.test_fraction
            );
        }

        let individuals: Vec<&str> = population.individuals().collect();
        let size = (individuals.len() as f64 * self.test_fraction) as usize;
        let mut rng = self.shared.rng();

        let mut test = Population::new();
        for &individual in individuals.choose_multiple(&mut rng, size) {
            if let Some(group) = population.group_of(individual) {
                test.add_individual(individual, group)?;
            }
        }
        Ok(test)
    }

    pub fn run(self, multi: &MultiProgress) -> Result<()> {
        let mut population = read_population_file(&self.population)?;
        let test = self.test_population(&mut population)?;
        for individual in test.individuals() {
            population.remove_individual(individual);
        }
        info!("Predicting {} against {}", test, population);
        if test.is_empty() {
            warn!("No individuals to predict");
        }

        let config = ClassifierConfig {
            strategy: self.strategy.into(),
            margin: self.margin,
            resolution: self.resolution,
        };
        let mut classifier =
            Classifier::new(config, population).with_individuals(test.individuals());
        if let Some(ref path) = self.polymorphisms {
            let polymorphisms = read_identifiers_file(path)?;
            info!("Restricting prediction to {} polymorphisms", polymorphisms.len());
            classifier = classifier.with_variant_filter(polymorphisms);
        }

        let reader = open_vcf(&self.vcf)?;
        let spinner = multi.add(create_spinner("Classifying")?);
        let labels = classifier
            .consume_with(Dispatcher::new(reader).with_progress(spinner.clone()))
            .with_context(|| format!("Failed to process VCF file: {}", self.vcf))?;
        spinner.finish_with_message("Classification done");

        let mut writer = ReportWriter::create(self.shared.output.as_deref())?;
        writer.write_predictions(&labels, &test)?;
        writer.finish()
    }
}

// Main entry point
pub fn main() -> Result<()> {
    use env_logger::Env;

    let logger = env_logger::Builder::from_env(Env::default().default_filter_or("info")).build();
    let level = logger.filter();
    let multi = MultiProgress::new();
    LogWrapper::new(multi.clone(), logger).try_init()?;
    log::set_max_level(level);

    let cli = Cli::parse();

    match cli.command {
        Commands::Table(args) => args.run(&multi),
        Commands::Model(args) => args.run(&multi),
        Commands::Predict(args) => args.run(&multi),
    }
}
