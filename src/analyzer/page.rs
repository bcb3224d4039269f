//! Page analysis: region detection, notes, tables and nozzles for one page.

use crate::analyzer::ocr::PpOcrEngine;
use crate::analyzer::result::{PageResult, format_elapsed};
use crate::analyzer::table_analyzer::SlanetTableRecognizer;
use crate::core::config::{AnalyzerConfig, ModelPaths, OrtSessionConfig};
use crate::core::errors::{ProcessingStage, VesselError, VesselResult};
use crate::core::inference::OrtInfer;
use crate::core::traits::{NoteExtractor, ObjectDetector, TableStructureRecognizer, TextRecognizer};
use crate::domain::{
    HttpNoteClient, NoteDispatcher, NoteEntry, Nozzle, RegionDetector, TableEntry,
    TableNormalizer, TextRecognitionAdapter, ViewNozzleExtractor,
};
use crate::models::{CrnnRecognizer, DbTextDetector, SlanetModel, YoloDetector};
use crate::processors::{CtcLabelDecode, TableStructureDecode};
use crate::utils::{PageAnnotator, crop_region, load_image};
use image::RgbImage;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// The ONNX-backed model services, loaded once and shared across pages.
#[derive(Debug, Clone)]
pub struct VesselModels {
    pub regions: Arc<dyn ObjectDetector>,
    pub views: Arc<dyn ObjectDetector>,
    pub nozzles: Arc<dyn ObjectDetector>,
    pub text: Arc<dyn TextRecognizer>,
    pub tables: Arc<dyn TableStructureRecognizer>,
}

impl VesselModels {
    /// Loads every model artifact named in `paths`.
    ///
    /// Fails before creating any session when an artifact is missing.
    pub fn load(
        paths: &ModelPaths,
        session: &OrtSessionConfig,
        config: &AnalyzerConfig,
    ) -> VesselResult<Self> {
        if let Some((name, path)) = paths.missing().into_iter().next() {
            return Err(VesselError::model_load_error(
                &path,
                format!("{name} model artifact not found"),
                Some("set VESSEL_MODEL_DIR or pass --model-dir"),
                None,
            ));
        }

        let start = Instant::now();
        let yolo = |path: &Path| -> VesselResult<Arc<dyn ObjectDetector>> {
            let inference = OrtInfer::from_config(session, path, None)?;
            let detector: Arc<dyn ObjectDetector> = Arc::new(YoloDetector::new(inference)?);
            Ok(detector)
        };
        let regions = yolo(&paths.regions)?;
        let views = yolo(&paths.views)?;
        let nozzles = yolo(&paths.nozzles)?;

        let detector = DbTextDetector::new(
            OrtInfer::from_config(session, &paths.text_detection, None)?,
            &config.text,
        )?;
        let recognizer = CrnnRecognizer::new(
            OrtInfer::from_config(session, &paths.text_recognition, None)?,
            CtcLabelDecode::from_file(&paths.text_dict)?,
        )?;
        let ocr = Arc::new(PpOcrEngine::new(detector, recognizer, &config.text));

        let slanet = SlanetModel::new(
            OrtInfer::from_config(session, &paths.table_structure, None)?,
            TableStructureDecode::from_dict_path(&paths.table_dict)?,
        )?;
        let tables = Arc::new(SlanetTableRecognizer::new(slanet, ocr.clone()));

        info!("Loaded models in {:.2?}", start.elapsed());
        Ok(Self {
            regions,
            views,
            nozzles,
            text: ocr,
            tables,
        })
    }
}

/// Extracts tables, nozzles and notes from drawing pages.
///
/// Built with [`PageAnalyzer::builder`]; holds no per-page state, so one
/// analyzer can serve any number of pages.
#[derive(Debug)]
pub struct PageAnalyzer {
    regions: RegionDetector,
    nozzles: ViewNozzleExtractor,
    tables: Arc<dyn TableStructureRecognizer>,
    normalizer: TableNormalizer,
    notes: NoteDispatcher,
    table_margin: i32,
    annotation: Option<(PageAnnotator, PathBuf)>,
    pool: Option<rayon::ThreadPool>,
}

impl PageAnalyzer {
    pub fn builder() -> PageAnalyzerBuilder {
        PageAnalyzerBuilder::new()
    }

    /// Loads an image (EXIF orientation applied) and analyzes it.
    pub fn analyze_path(&self, path: impl AsRef<Path>, page: u32) -> VesselResult<PageResult> {
        let image = load_image(path.as_ref())?;
        self.analyze(&image, page)
    }

    /// Runs regions, notes, tables and nozzles, in that order.
    ///
    /// The annotated page is written afterwards when configured; failing to
    /// write it does not fail the page.
    pub fn analyze(&self, image: &RgbImage, page: u32) -> VesselResult<PageResult> {
        let start = Instant::now();
        let run = || self.run_stages(image);
        let (tables, nozzles, notes) = match &self.pool {
            Some(pool) => pool.install(run),
            None => run(),
        }?;

        let result = PageResult {
            time: format_elapsed(start.elapsed()),
            page,
            tables,
            nozzles,
            notes,
        };
        info!(
            page,
            tables = result.tables.len(),
            nozzles = result.nozzles.len(),
            notes = result.notes.len(),
            "Page analyzed in {}",
            result.time
        );

        if let Some((annotator, path)) = &self.annotation {
            if let Err(e) = annotator.save(image, &result, path) {
                warn!("Failed to write annotated page: {}", e);
            }
        }

        Ok(result)
    }

    fn run_stages(
        &self,
        image: &RgbImage,
    ) -> VesselResult<(Vec<TableEntry>, Vec<Nozzle>, Vec<NoteEntry>)> {
        let stage = Instant::now();
        let regions = self.regions.detect(image)?;
        debug!("Regions in {:.2?}", stage.elapsed());

        let stage = Instant::now();
        let notes = self.notes.dispatch(image, regions.notes());
        debug!("Notes in {:.2?}", stage.elapsed());

        let stage = Instant::now();
        let tables = regions
            .tables()
            .iter()
            .map(|bbox| {
                let expanded = bbox.expand(self.table_margin, image.width(), image.height());
                let crop = crop_region(image, &expanded);
                let markup = if crop.width() == 0 || crop.height() == 0 {
                    None
                } else {
                    self.tables.recognize(&crop).map_err(|e| {
                        VesselError::stage(ProcessingStage::TableRecognition, "recognize table", e)
                    })?
                };
                Ok(TableEntry {
                    table: self.normalizer.normalize(markup.as_deref()),
                    bbox: bbox.to_xywh(),
                })
            })
            .collect::<VesselResult<Vec<_>>>()?;
        debug!("Tables in {:.2?}", stage.elapsed());

        let stage = Instant::now();
        let nozzles = self.nozzles.extract(image)?;
        debug!("Nozzles in {:.2?}", stage.elapsed());

        Ok((tables, nozzles, notes))
    }
}

/// Builder for [`PageAnalyzer`].
///
/// Every model service must be provided, either all at once through
/// [`models`](Self::models) or one by one. The note extractor defaults to an
/// [`HttpNoteClient`] for the configured service URL.
#[derive(Debug, Default)]
pub struct PageAnalyzerBuilder {
    config: AnalyzerConfig,
    region_detector: Option<Arc<dyn ObjectDetector>>,
    view_detector: Option<Arc<dyn ObjectDetector>>,
    nozzle_detector: Option<Arc<dyn ObjectDetector>>,
    text_recognizer: Option<Arc<dyn TextRecognizer>>,
    table_recognizer: Option<Arc<dyn TableStructureRecognizer>>,
    note_extractor: Option<Arc<dyn NoteExtractor>>,
}

impl PageAnalyzerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: AnalyzerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets every model service from a loaded [`VesselModels`].
    pub fn models(self, models: VesselModels) -> Self {
        self.region_detector(models.regions)
            .view_detector(models.views)
            .nozzle_detector(models.nozzles)
            .text_recognizer(models.text)
            .table_recognizer(models.tables)
    }

    pub fn region_detector(mut self, detector: Arc<dyn ObjectDetector>) -> Self {
        self.region_detector = Some(detector);
        self
    }

    pub fn view_detector(mut self, detector: Arc<dyn ObjectDetector>) -> Self {
        self.view_detector = Some(detector);
        self
    }

    pub fn nozzle_detector(mut self, detector: Arc<dyn ObjectDetector>) -> Self {
        self.nozzle_detector = Some(detector);
        self
    }

    pub fn text_recognizer(mut self, recognizer: Arc<dyn TextRecognizer>) -> Self {
        self.text_recognizer = Some(recognizer);
        self
    }

    pub fn table_recognizer(mut self, recognizer: Arc<dyn TableStructureRecognizer>) -> Self {
        self.table_recognizer = Some(recognizer);
        self
    }

    pub fn note_extractor(mut self, extractor: Arc<dyn NoteExtractor>) -> Self {
        self.note_extractor = Some(extractor);
        self
    }

    pub fn build(self) -> VesselResult<PageAnalyzer> {
        let config = self.config;
        config.validate()?;

        let region_detector = require(self.region_detector, "region_detector")?;
        let view_detector = require(self.view_detector, "view_detector")?;
        let nozzle_detector = require(self.nozzle_detector, "nozzle_detector")?;
        let text_recognizer = require(self.text_recognizer, "text_recognizer")?;
        let table_recognizer = require(self.table_recognizer, "table_recognizer")?;
        let note_extractor = match self.note_extractor {
            Some(extractor) => extractor,
            None => {
                let client = HttpNoteClient::new(&config.notes).map_err(|e| VesselError::ConfigError {
                    message: format!("failed to create note service client: {e}"),
                })?;
                Arc::new(client)
            }
        };

        let pool = config
            .parallel
            .build_pool()
            .map_err(|e| VesselError::ConfigError {
                message: format!("failed to build thread pool: {e}"),
            })?;

        let annotation = config.annotation.output_path.clone().map(|path| {
            (PageAnnotator::new(config.annotation.font_path.as_deref()), path)
        });

        Ok(PageAnalyzer {
            regions: RegionDetector::new(region_detector, &config.regions),
            nozzles: ViewNozzleExtractor::new(
                view_detector,
                nozzle_detector,
                TextRecognitionAdapter::new(text_recognizer),
                config.views.clone(),
                config.parallel.clone(),
            ),
            tables: table_recognizer,
            normalizer: TableNormalizer::new(),
            notes: NoteDispatcher::new(note_extractor, config.regions.note_margin, config.parallel.clone()),
            table_margin: config.regions.table_margin,
            annotation,
            pool,
        })
    }
}

fn require<T>(service: Option<T>, name: &str) -> VesselResult<T> {
    service.ok_or_else(|| VesselError::ConfigError {
        message: format!("PageAnalyzer requires a {name}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::DetectionParams;
    use crate::processors::Detection;

    #[derive(Debug)]
    struct NoDetections;

    impl ObjectDetector for NoDetections {
        fn detect(&self, _image: &RgbImage, _params: &DetectionParams) -> VesselResult<Vec<Detection>> {
            Ok(Vec::new())
        }
    }

    #[derive(Debug)]
    struct NoText;

    impl TextRecognizer for NoText {
        fn recognize(&self, _image: &RgbImage) -> VesselResult<Vec<String>> {
            Ok(Vec::new())
        }
    }

    #[derive(Debug)]
    struct NoTables;

    impl TableStructureRecognizer for NoTables {
        fn recognize(&self, _image: &RgbImage) -> VesselResult<Option<String>> {
            Ok(None)
        }
    }

    fn quiet_config() -> AnalyzerConfig {
        let mut config = AnalyzerConfig::default();
        config.annotation.output_path = None;
        config
    }

    fn complete_builder() -> PageAnalyzerBuilder {
        let detector: Arc<dyn ObjectDetector> = Arc::new(NoDetections);
        PageAnalyzer::builder()
            .config(quiet_config())
            .region_detector(detector.clone())
            .view_detector(detector.clone())
            .nozzle_detector(detector)
            .text_recognizer(Arc::new(NoText))
            .table_recognizer(Arc::new(NoTables))
    }

    #[test]
    fn test_build_requires_every_model() {
        let err = PageAnalyzer::builder()
            .config(quiet_config())
            .region_detector(Arc::new(NoDetections))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("view_detector"));
    }

    #[test]
    fn test_build_rejects_invalid_config() {
        let mut config = quiet_config();
        config.regions.confidence = 1.5;
        assert!(matches!(
            complete_builder().config(config).build(),
            Err(VesselError::ConfigError { .. })
        ));
    }

    #[test]
    fn test_blank_page_gives_empty_result() {
        let analyzer = complete_builder().build().unwrap();
        let result = analyzer.analyze(&RgbImage::new(64, 64), 3).unwrap();
        assert_eq!(result.page, 3);
        assert!(result.time.ends_with(" Seconds"));
        assert!(result.tables.is_empty() && result.nozzles.is_empty() && result.notes.is_empty());
    }

    #[test]
    fn test_load_reports_missing_artifacts() {
        let dir = std::env::temp_dir().join("vessel-ocr-no-models");
        let err = VesselModels::load(
            &ModelPaths::in_dir(&dir),
            &OrtSessionConfig::default(),
            &AnalyzerConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, VesselError::ModelLoad { .. }));
    }
}
