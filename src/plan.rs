use crate::types::Pt;

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedPage {
    pub blocks: Vec<usize>,
    pub used_height: Pt,
}

impl PlannedPage {
    fn empty() -> Self {
        Self {
            blocks: Vec::new(),
            used_height: Pt::ZERO,
        }
    }

    fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// Packs measured block heights onto pages of `page_height` without splitting a block.
/// A block that does not fit closes the current page. A block taller than a whole page
/// gets a page to itself. Non-finite or negative heights count as zero. At least one
/// page is always returned.
pub fn pack_blocks(page_height: f32, heights: &[f32]) -> Vec<PlannedPage> {
    let budget = Pt::from_f32(page_height.max(0.0)).to_milli_i64();
    let mut pages = Vec::new();
    let mut current = PlannedPage::empty();
    let mut running = 0i64;

    for (index, &height) in heights.iter().enumerate() {
        let h = sanitize_milli(height);

        if h > budget {
            if !current.is_empty() {
                pages.push(std::mem::replace(&mut current, PlannedPage::empty()));
                running = 0;
            }
            log::debug!("block {index} is taller than the page; placing it alone");
            pages.push(PlannedPage {
                blocks: vec![index],
                used_height: Pt::from_milli_i64(h),
            });
            continue;
        }

        if running.saturating_add(h) > budget && !current.is_empty() {
            pages.push(std::mem::replace(&mut current, PlannedPage::empty()));
            running = 0;
        }
        running = running.saturating_add(h);
        current.blocks.push(index);
        current.used_height = Pt::from_milli_i64(running);
    }

    if !current.is_empty() || pages.is_empty() {
        pages.push(current);
    }
    pages
}

pub fn flow_page_count(total_height: f32, page_height: f32) -> usize {
    let total = sanitize_milli(total_height);
    let page = sanitize_milli(page_height);
    if page == 0 || total == 0 {
        return 1;
    }
    let pages = (total + page - 1) / page;
    usize::try_from(pages).unwrap_or(usize::MAX).max(1)
}

fn sanitize_milli(height: f32) -> i64 {
    if !height.is_finite() || height <= 0.0 {
        0
    } else {
        Pt::from_f32(height).to_milli_i64()
    }
}
