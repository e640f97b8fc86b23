pub mod classifier;
pub mod cone;
pub mod degree;
pub mod edge_list;
pub mod graph;
pub mod report;

use std::path::PathBuf;
use std::time::Instant;

use tracing::info;

use crate::extractor::input::open_input;
use crate::shared::{Result, ASN, DEFAULT_PROVIDER_RATIO, DEFAULT_TOP_N};

pub use classifier::{ClassificationStats, ClassifiedLink, RelationshipClassifier};
pub use cone::{ConeCalculator, Cones};
pub use degree::DegreeTable;
pub use edge_list::{EdgeList, HeaderMode};
pub use graph::{CustomerGraph, TopologyNode};

/// Configuration for one cone computation run
#[derive(Debug, Clone)]
pub struct ConeConfig {
    /// Edge list, typically the stage-1 relationship table
    pub input: PathBuf,

    /// Ranked cone table
    pub output: PathBuf,

    /// Rows shown in the console ranking
    pub top_n: usize,

    pub provider_ratio: f64,

    pub header: HeaderMode,

    /// Identifiers never placed on the customer side of a link
    pub protected_asns: Vec<ASN>,

    /// Optional provider -> customers JSON export
    pub graph_json: Option<PathBuf>,
}

impl ConeConfig {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        ConeConfig {
            input: input.into(),
            output: PathBuf::from("as_rank_caida.csv"),
            top_n: DEFAULT_TOP_N,
            provider_ratio: DEFAULT_PROVIDER_RATIO,
            header: HeaderMode::Auto,
            protected_asns: Vec::new(),
            graph_json: None,
        }
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = output.into();
        self
    }

    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    pub fn with_provider_ratio(mut self, ratio: f64) -> Self {
        self.provider_ratio = ratio;
        self
    }

    pub fn with_header(mut self, header: HeaderMode) -> Self {
        self.header = header;
        self
    }

    pub fn with_protected_asns(mut self, asns: Vec<ASN>) -> Self {
        self.protected_asns = asns;
        self
    }

    pub fn with_graph_json(mut self, path: impl Into<PathBuf>) -> Self {
        self.graph_json = Some(path.into());
        self
    }

    pub fn classifier(&self) -> RelationshipClassifier {
        RelationshipClassifier::new()
            .with_provider_ratio(self.provider_ratio)
            .with_protected(self.protected_asns.iter().cloned())
    }
}

#[derive(Debug)]
pub struct ConeReport {
    pub graph: CustomerGraph,
    pub stats: ClassificationStats,
    pub edges_read: usize,
    pub cyclic_components: usize,
    pub elapsed_secs: f64,
}

impl ConeReport {
    pub fn top_table(&self, top_n: usize) -> String {
        report::render_top_cones(&self.graph.ranked(), top_n)
    }
}

/// Runs stage 2: edge list in, degrees, inferred hierarchy and cone ranking out.
pub struct ConeRunner {
    pub config: ConeConfig,
}

impl ConeRunner {
    pub fn new(config: ConeConfig) -> Self {
        ConeRunner { config }
    }

    pub fn run(&self) -> Result<ConeReport> {
        let start = Instant::now();
        let classifier = self.config.classifier();
        classifier.validate()?;

        info!("[1/3] Loading data & calculating node degrees");
        let reader = open_input(&self.config.input)?;
        let edges = EdgeList::read(reader, self.config.header)?;
        let degrees = DegreeTable::from_edges(&edges.edges);
        info!(
            edges = edges.len(),
            skipped = edges.skipped_rows,
            header = edges.header_skipped,
            asns = degrees.len(),
            "loaded edge list"
        );

        info!(ratio = classifier.provider_ratio, "[2/3] Inferring provider-customer relationships");
        let (mut graph, stats) = classifier.build_hierarchy(&edges.edges, &degrees);

        info!("[3/3] Calculating customer cones");
        let cones = ConeCalculator::new(&graph).compute();
        graph.assign_cone_sizes(&cones);

        report::write_cone_ranking(&self.config.output, &graph.ranked())?;
        if let Some(path) = &self.config.graph_json {
            report::write_downstream_graph(path, &graph)?;
        }

        Ok(ConeReport {
            graph,
            stats,
            edges_read: edges.len(),
            cyclic_components: cones.cyclic_components(),
            elapsed_secs: start.elapsed().as_secs_f64(),
        })
    }
}
