mod canvas;
mod debug;
mod error;
mod host;
mod metrics;
mod path;
mod pdf;
mod perf;
mod plan;
mod raster;
mod render;
mod scene;
mod style;
mod surface;
mod types;

pub use canvas::{Canvas, CanvasSink, Command, Document, Page};
use debug::DebugLogger;
pub use error::{PageSceneError, Result};
pub use host::{
    CancelToken, ContentHost, DEFAULT_MEASURE_TIMEOUT, LayoutSignal, SharedHost, measure_block,
};
pub use metrics::{DocumentMetrics, PageMetrics};
pub use path::{ParsedPath, PathSeg, parse_path_data};
pub use pdf::{DirectPdfSink, MergePdfSink, PdfSurface, merge_pdfs};
use perf::{PerfLogger, timed};
pub use plan::{PlannedPage, flow_page_count, pack_blocks};
pub use raster::{DecodedImage, decode_image_bytes, decode_image_href};
pub use render::{MAX_USE_DEPTH, MAX_USE_EXPANSIONS, RenderOptions, RenderStats, render_scene};
pub use scene::{NodeKind, SceneNode, parse_scene};
pub use style::{Matrix, PaintState, ViewBox, parse_color, parse_length, parse_transform};
pub use surface::{FontSpec, PageSink, Surface, YAxis, ellipse_path, rect_path};
pub use types::{Orientation, PageFormat, Pt, Rgba, Size};

use rayon::prelude::*;
use serde_json::json;
use std::path::PathBuf;
use std::time::{Duration, Instant};

pub struct ScenePager {
    page_size: Size,
    measure_timeout: Duration,
    parallel_parse: bool,
    debug: Option<DebugLogger>,
    perf: Option<PerfLogger>,
}

#[derive(Debug)]
pub struct RenderOutput<T> {
    pub output: T,
    pub metrics: DocumentMetrics,
}

#[derive(Debug, Clone, Copy)]
struct FlowWindow {
    offset: f32,
    scene_height: f32,
}

impl ScenePager {
    pub fn builder() -> ScenePagerBuilder {
        ScenePagerBuilder::new()
    }

    pub fn page_size(&self) -> Size {
        self.page_size
    }

    fn width(&self) -> f32 {
        self.page_size.width.to_f32()
    }

    fn height(&self) -> f32 {
        self.page_size.height.to_f32()
    }

    pub fn measure_blocks<H: ContentHost>(
        &self,
        host: &SharedHost<H>,
        blocks: &[H::Content],
        cancel: &CancelToken,
    ) -> Result<Vec<f32>> {
        let width = self.width();
        blocks
            .iter()
            .enumerate()
            .map(|(index, block)| {
                cancel.check()?;
                let height = measure_block(host, block, width, self.measure_timeout)?;
                log::debug!("block {index} measured at {height}pt");
                Ok(height)
            })
            .collect()
    }

    pub fn plan_blocks(&self, heights: &[f32]) -> Vec<PlannedPage> {
        let pages = pack_blocks(self.height(), heights);
        for (index, page) in pages.iter().enumerate() {
            log::debug!(
                "page {} planned with {} block(s), {}pt used",
                index + 1,
                page.blocks.len(),
                page.used_height.to_f32()
            );
            if let Some(debug) = &self.debug {
                debug.log_event(&json!({
                    "type": "plan.page",
                    "page": index + 1,
                    "blocks": page.blocks,
                    "used_height": page.used_height.to_f32(),
                    "page_height": self.height(),
                }));
            }
        }
        pages
    }

    pub fn render_blocks<H, S>(
        &self,
        host: &SharedHost<H>,
        blocks: &[H::Content],
        mut sink: S,
        cancel: &CancelToken,
    ) -> Result<RenderOutput<S::Output>>
    where
        H: ContentHost,
        S: PageSink,
    {
        let perf = self.perf.as_ref();
        let mut metrics = DocumentMetrics::default();
        let (width, height) = (self.width(), self.height());

        let (heights, ms) = timed(perf, "measure", None, || {
            self.measure_blocks(host, blocks, cancel)
        });
        let heights = heights?;
        metrics.measure_ms = ms;

        let pages = self.plan_blocks(&heights);

        let (markups, ms) = timed(perf, "compose", None, || -> Result<Vec<String>> {
            pages
                .iter()
                .map(|page| {
                    cancel.check()?;
                    let members: Vec<&H::Content> =
                        page.blocks.iter().map(|&i| &blocks[i]).collect();
                    host.lock()?.render_blocks(&members, width, height)
                })
                .collect()
        });
        let markups = markups?;
        metrics.compose_ms = ms;

        let (scenes, ms) = timed(perf, "parse", None, || self.parse_all(&markups));
        metrics.parse_ms = ms;

        for (index, (page, scene)) in pages.iter().zip(&scenes).enumerate() {
            cancel.check()?;
            let page_metrics =
                self.render_page(&mut sink, index, scene.as_ref(), page.blocks.len(), None)?;
            metrics.total_render_ms += page_metrics.render_ms;
            metrics.pages.push(page_metrics);
        }

        let output = sink.finish()?;
        self.finish_logs("render_blocks", &metrics);
        Ok(RenderOutput { output, metrics })
    }

    pub fn render_flow<H, S>(
        &self,
        host: &SharedHost<H>,
        content: &H::Content,
        mut sink: S,
        cancel: &CancelToken,
    ) -> Result<RenderOutput<S::Output>>
    where
        H: ContentHost,
        S: PageSink,
    {
        let perf = self.perf.as_ref();
        let mut metrics = DocumentMetrics::default();
        let (width, height) = (self.width(), self.height());

        cancel.check()?;
        let (total, ms) = timed(perf, "measure", None, || {
            measure_block(host, content, width, self.measure_timeout)
        });
        let total = total?;
        metrics.measure_ms = ms;

        let page_count = flow_page_count(total, height);
        log::debug!("flow of {total}pt spans {page_count} page(s)");
        if let Some(debug) = &self.debug {
            debug.log_event(&json!({
                "type": "plan.flow",
                "total_height": total,
                "page_height": height,
                "pages": page_count,
            }));
        }

        cancel.check()?;
        let (markup, ms) = timed(perf, "compose", None, || -> Result<String> {
            host.lock()?.render_flow(content, width, total)
        });
        let markup = markup?;
        metrics.compose_ms = ms;

        let (scene, ms) = timed(perf, "parse", None, || parse_scene(&markup));
        metrics.parse_ms = ms;
        if scene.is_none() {
            log::warn!("flow scene markup has no root element");
        }

        for index in 0..page_count {
            cancel.check()?;
            let window = FlowWindow {
                offset: index as f32 * height,
                scene_height: total.max(height),
            };
            let page_metrics =
                self.render_page(&mut sink, index, scene.as_ref(), 1, Some(window))?;
            metrics.total_render_ms += page_metrics.render_ms;
            metrics.pages.push(page_metrics);
        }

        let output = sink.finish()?;
        self.finish_logs("render_flow", &metrics);
        Ok(RenderOutput { output, metrics })
    }

    pub fn render_scenes<S: PageSink>(
        &self,
        markups: &[String],
        mut sink: S,
    ) -> Result<RenderOutput<S::Output>> {
        let mut metrics = DocumentMetrics::default();
        let (scenes, ms) = timed(self.perf.as_ref(), "parse", None, || {
            self.parse_all(markups)
        });
        metrics.parse_ms = ms;

        for (index, scene) in scenes.iter().enumerate() {
            let page_metrics = self.render_page(&mut sink, index, scene.as_ref(), 0, None)?;
            metrics.total_render_ms += page_metrics.render_ms;
            metrics.pages.push(page_metrics);
        }
        if scenes.is_empty() {
            let page_metrics = self.render_page(&mut sink, 0, None, 0, None)?;
            metrics.pages.push(page_metrics);
        }

        let output = sink.finish()?;
        self.finish_logs("render_scenes", &metrics);
        Ok(RenderOutput { output, metrics })
    }

    fn parse_all(&self, markups: &[String]) -> Vec<Option<SceneNode>> {
        let scenes: Vec<Option<SceneNode>> = if self.parallel_parse && markups.len() > 1 {
            markups.par_iter().map(|m| parse_scene(m)).collect()
        } else {
            markups.iter().map(|m| parse_scene(m)).collect()
        };
        for (index, scene) in scenes.iter().enumerate() {
            if scene.is_none() {
                log::warn!("page {} scene markup has no root element", index + 1);
            }
        }
        scenes
    }

    fn render_page<S: PageSink>(
        &self,
        sink: &mut S,
        index: usize,
        scene: Option<&SceneNode>,
        block_count: usize,
        flow: Option<FlowWindow>,
    ) -> Result<PageMetrics> {
        let start = Instant::now();
        let (width, height) = (self.width(), self.height());
        let mut surface = sink.begin_page(index, self.page_size)?;

        let stats = match (scene, flow) {
            (None, _) => RenderStats::default(),
            (Some(root), None) => render_scene(
                root,
                &mut surface,
                RenderOptions {
                    page_width: width,
                    page_height: height,
                },
            ),
            (Some(root), Some(window)) => {
                surface.save();
                surface.clip_rect(0.0, 0.0, width, height);
                surface.concat_matrix(Matrix::translate(0.0, -window.offset));
                let stats = render_scene(
                    root,
                    &mut surface,
                    RenderOptions {
                        page_width: width,
                        page_height: window.scene_height,
                    },
                );
                surface.restore();
                stats
            }
        };
        sink.end_page(surface)?;

        let render_ms = start.elapsed().as_secs_f64() * 1000.0;
        let page_number = index + 1;
        log::debug!(
            "page {page_number} rendered: {} drawn, {} unresolved use(s), {} skipped",
            stats.drawn,
            stats.unresolved_uses,
            stats.skipped
        );
        if let Some(perf) = &self.perf {
            perf.log_span_ms("render", Some(page_number), render_ms);
            perf.log_counts(
                "render",
                Some(page_number),
                &[
                    ("drawn", stats.drawn as u64),
                    ("unresolved_uses", stats.unresolved_uses as u64),
                    ("skipped", stats.skipped as u64),
                ],
            );
        }
        if let Some(debug) = &self.debug {
            debug.increment("pages", 1);
            debug.increment("drawn", stats.drawn as u64);
            debug.increment("unresolved_uses", stats.unresolved_uses as u64);
            debug.increment("skipped", stats.skipped as u64);
        }

        Ok(PageMetrics {
            page_number,
            render_ms,
            block_count,
            drawn_elements: stats.drawn,
            unresolved_uses: stats.unresolved_uses,
            skipped_elements: stats.skipped,
        })
    }

    fn finish_logs(&self, context: &str, metrics: &DocumentMetrics) {
        if let Some(debug) = &self.debug {
            debug.log_event(&metrics.to_json());
            debug.emit_summary(context);
            debug.flush();
        }
        if let Some(perf) = &self.perf {
            perf.flush();
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScenePagerBuilder {
    page_format: PageFormat,
    orientation: Orientation,
    page_size: Option<Size>,
    measure_timeout: Duration,
    parallel_parse: bool,
    debug_path: Option<PathBuf>,
    perf_path: Option<PathBuf>,
}

impl Default for ScenePagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ScenePagerBuilder {
    pub fn new() -> Self {
        Self {
            page_format: PageFormat::default(),
            orientation: Orientation::default(),
            page_size: None,
            measure_timeout: DEFAULT_MEASURE_TIMEOUT,
            parallel_parse: true,
            debug_path: None,
            perf_path: None,
        }
    }

    pub fn page_format(mut self, format: PageFormat) -> Self {
        self.page_format = format;
        self
    }

    pub fn orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn page_size(mut self, size: Size) -> Self {
        self.page_size = Some(size);
        self
    }

    pub fn measure_timeout(mut self, timeout: Duration) -> Self {
        self.measure_timeout = timeout;
        self
    }

    pub fn parallel_parse(mut self, enabled: bool) -> Self {
        self.parallel_parse = enabled;
        self
    }

    pub fn debug_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.debug_path = Some(path.into());
        self
    }

    pub fn perf_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.perf_path = Some(path.into());
        self
    }

    pub fn build(self) -> Result<ScenePager> {
        let page_size = self
            .page_size
            .unwrap_or_else(|| self.page_format.effective_size(self.orientation));
        if !page_size.is_drawable() {
            return Err(PageSceneError::InvalidConfiguration(format!(
                "page size must be positive and finite, got {}x{}pt",
                page_size.width.to_f32(),
                page_size.height.to_f32()
            )));
        }
        if self.measure_timeout.is_zero() {
            return Err(PageSceneError::InvalidConfiguration(
                "measure_timeout must be greater than zero".to_string(),
            ));
        }
        let debug = match self.debug_path {
            Some(path) => Some(DebugLogger::new(path)?),
            None => None,
        };
        let perf = match self.perf_path {
            Some(path) => Some(PerfLogger::new(path)?),
            None => None,
        };
        Ok(ScenePager {
            page_size,
            measure_timeout: self.measure_timeout,
            parallel_parse: self.parallel_parse,
            debug,
            perf,
        })
    }
}
