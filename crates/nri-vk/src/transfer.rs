//! Regions, clears and viewports as the copy and render commands need them.

use ash::vk;
use nri_core::{
    ClearDesc, ClearValue, Color, Rect, TextureDataLayoutDesc, TextureDesc, TextureRegionDesc,
    Viewport,
};

use crate::conversions::planes_to_aspect;

pub(crate) fn viewport_to_vk(viewport: &Viewport) -> vk::Viewport {
    let (y, height) = if viewport.origin_bottom_left {
        (viewport.y + viewport.height, -viewport.height)
    } else {
        (viewport.y, viewport.height)
    };
    vk::Viewport {
        x: viewport.x,
        y,
        width: viewport.width,
        height,
        min_depth: viewport.depth_min,
        max_depth: viewport.depth_max,
    }
}

pub(crate) fn rect_to_vk(rect: &Rect) -> vk::Rect2D {
    vk::Rect2D {
        offset: vk::Offset2D {
            x: i32::from(rect.x),
            y: i32::from(rect.y),
        },
        extent: vk::Extent2D {
            width: u32::from(rect.width),
            height: u32::from(rect.height),
        },
    }
}

pub(crate) fn clear_color(color: Color) -> vk::ClearColorValue {
    match color {
        Color::Float(float32) => vk::ClearColorValue { float32 },
        Color::Uint(uint32) => vk::ClearColorValue { uint32 },
        Color::Int(int32) => vk::ClearColorValue { int32 },
    }
}

/// A clear inside the current rendering; depth-stencil clears are limited to
/// the aspects the bound attachment has.
pub(crate) fn clear_attachment(
    clear: &ClearDesc,
    depth_stencil_aspects: vk::ImageAspectFlags,
) -> vk::ClearAttachment {
    match clear.value {
        ClearValue::Color(color) => vk::ClearAttachment {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            color_attachment: clear.color_attachment_index,
            clear_value: vk::ClearValue {
                color: clear_color(color),
            },
        },
        ClearValue::DepthStencil(ds) => {
            let mut aspects = vk::ImageAspectFlags::empty();
            if clear.planes.is_empty() || clear.planes.contains(nri_core::PlaneBits::DEPTH) {
                aspects |= vk::ImageAspectFlags::DEPTH;
            }
            if clear.planes.is_empty() || clear.planes.contains(nri_core::PlaneBits::STENCIL) {
                aspects |= vk::ImageAspectFlags::STENCIL;
            }
            vk::ClearAttachment {
                aspect_mask: aspects & depth_stencil_aspects,
                color_attachment: 0,
                clear_value: vk::ClearValue {
                    depth_stencil: vk::ClearDepthStencilValue {
                        depth: ds.depth,
                        stencil: u32::from(ds.stencil),
                    },
                },
            }
        }
    }
}

/// Clear rectangles; no rects clears the whole render area.
pub(crate) fn clear_rects(rects: &[Rect], render_area: vk::Rect2D, layer_count: u32) -> Vec<vk::ClearRect> {
    let layer_count = layer_count.max(1);
    if rects.is_empty() {
        return vec![vk::ClearRect {
            rect: render_area,
            base_array_layer: 0,
            layer_count,
        }];
    }
    rects
        .iter()
        .map(|r| vk::ClearRect {
            rect: rect_to_vk(r),
            base_array_layer: 0,
            layer_count,
        })
        .collect()
}

/// Offset and extent of a region; zero sizes reach to the end of the mip.
pub(crate) fn region_bounds(desc: &TextureDesc, region: &TextureRegionDesc) -> (vk::Offset3D, vk::Extent3D) {
    let [width, height, depth] = desc.mip_extent(region.mip_offset);
    let size = |requested: u32, full: u32, offset: u32| {
        if requested == 0 {
            full.saturating_sub(offset)
        } else {
            requested
        }
    };
    (
        vk::Offset3D {
            x: region.x as i32,
            y: region.y as i32,
            z: region.z as i32,
        },
        vk::Extent3D {
            width: size(region.width, width, region.x),
            height: size(region.height, height, region.y),
            depth: size(region.depth, depth, region.z),
        },
    )
}

pub(crate) fn region_layers(desc: &TextureDesc, region: &TextureRegionDesc) -> vk::ImageSubresourceLayers {
    vk::ImageSubresourceLayers {
        aspect_mask: planes_to_aspect(region.planes, desc.format),
        mip_level: region.mip_offset,
        base_array_layer: region.layer_offset,
        layer_count: 1,
    }
}

fn whole_mip_layers(desc: &TextureDesc, mip: u32) -> vk::ImageSubresourceLayers {
    vk::ImageSubresourceLayers {
        aspect_mask: planes_to_aspect(Default::default(), desc.format),
        mip_level: mip,
        base_array_layer: 0,
        layer_count: desc.layer_num,
    }
}

/// Image-to-image regions. Without regions every mip of every layer is copied.
pub(crate) fn image_copies(
    dst: &TextureDesc,
    dst_region: Option<&TextureRegionDesc>,
    src: &TextureDesc,
    src_region: Option<&TextureRegionDesc>,
) -> Vec<vk::ImageCopy> {
    match (dst_region, src_region) {
        (Some(dst_region), Some(src_region)) => {
            let (src_offset, extent) = region_bounds(src, src_region);
            let (dst_offset, _) = region_bounds(dst, dst_region);
            vec![vk::ImageCopy {
                src_subresource: region_layers(src, src_region),
                src_offset,
                dst_subresource: region_layers(dst, dst_region),
                dst_offset,
                extent,
            }]
        }
        _ => (0..src.mip_num.min(dst.mip_num))
            .map(|mip| {
                let [width, height, depth] = src.mip_extent(mip);
                vk::ImageCopy {
                    src_subresource: whole_mip_layers(src, mip),
                    src_offset: vk::Offset3D::default(),
                    dst_subresource: whole_mip_layers(dst, mip),
                    dst_offset: vk::Offset3D::default(),
                    extent: vk::Extent3D {
                        width,
                        height,
                        depth,
                    },
                }
            })
            .collect(),
    }
}

/// Resolve regions follow the same rules as copies.
pub(crate) fn image_resolves(
    dst: &TextureDesc,
    dst_region: Option<&TextureRegionDesc>,
    src: &TextureDesc,
    src_region: Option<&TextureRegionDesc>,
) -> Vec<vk::ImageResolve> {
    image_copies(dst, dst_region, src, src_region)
        .into_iter()
        .map(|c| vk::ImageResolve {
            src_subresource: c.src_subresource,
            src_offset: c.src_offset,
            dst_subresource: c.dst_subresource,
            dst_offset: c.dst_offset,
            extent: c.extent,
        })
        .collect()
}

/// Buffer-image copy with byte pitches turned into texel rows.
pub(crate) fn buffer_image_copy(
    texture: &TextureDesc,
    region: &TextureRegionDesc,
    layout: &TextureDataLayoutDesc,
) -> vk::BufferImageCopy {
    let props = texture.format.props();
    let stride = u32::from(props.stride.max(1));
    let row_length = layout.row_pitch / stride * u32::from(props.block_width.max(1));
    let image_height = if layout.row_pitch == 0 {
        0
    } else {
        layout.slice_pitch / layout.row_pitch * u32::from(props.block_height.max(1))
    };
    let (image_offset, image_extent) = region_bounds(texture, region);
    vk::BufferImageCopy {
        buffer_offset: layout.offset,
        buffer_row_length: row_length,
        buffer_image_height: image_height,
        image_subresource: region_layers(texture, region),
        image_offset,
        image_extent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nri_core::{DepthStencil, Format, PlaneBits};

    #[test]
    fn bottom_left_viewports_flip() {
        let mut viewport = Viewport::new(1920.0, 1080.0);
        assert_eq!(viewport_to_vk(&viewport).height, 1080.0);
        viewport.origin_bottom_left = true;
        let native = viewport_to_vk(&viewport);
        assert_eq!((native.y, native.height), (1080.0, -1080.0));
        assert_eq!(native.max_depth, 1.0);
    }

    #[test]
    fn depth_clears_respect_the_attachment() {
        let clear = ClearDesc {
            value: ClearValue::DepthStencil(DepthStencil {
                depth: 1.0,
                stencil: 7,
            }),
            ..Default::default()
        };
        let depth_only = clear_attachment(&clear, vk::ImageAspectFlags::DEPTH);
        assert_eq!(depth_only.aspect_mask, vk::ImageAspectFlags::DEPTH);

        let stencil = ClearDesc {
            planes: PlaneBits::STENCIL,
            ..clear
        };
        let both = vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL;
        assert_eq!(
            clear_attachment(&stencil, both).aspect_mask,
            vk::ImageAspectFlags::STENCIL
        );

        let color = ClearDesc {
            color_attachment_index: 2,
            ..Default::default()
        };
        let native = clear_attachment(&color, both);
        assert_eq!(native.aspect_mask, vk::ImageAspectFlags::COLOR);
        assert_eq!(native.color_attachment, 2);
    }

    #[test]
    fn empty_clear_rects_cover_the_render_area() {
        let area = vk::Rect2D {
            offset: vk::Offset2D::default(),
            extent: vk::Extent2D {
                width: 640,
                height: 480,
            },
        };
        let rects = clear_rects(&[], area, 0);
        assert_eq!(rects.len(), 1);
        assert_eq!(rects[0].rect.extent.width, 640);
        assert_eq!(rects[0].layer_count, 1);

        let rects = clear_rects(&[Rect::new(-4, 8, 16, 16)], area, 2);
        assert_eq!(rects[0].rect.offset.x, -4);
        assert_eq!(rects[0].layer_count, 2);
    }

    #[test]
    fn regions_default_to_the_rest_of_the_mip() {
        let desc = TextureDesc::texture_2d(Format::Rgba8Unorm, 256, 128, 3, 1);
        let region = TextureRegionDesc {
            x: 16,
            mip_offset: 1,
            ..Default::default()
        };
        let (offset, extent) = region_bounds(&desc, &region);
        assert_eq!(offset.x, 16);
        assert_eq!((extent.width, extent.height, extent.depth), (112, 64, 1));
    }

    #[test]
    fn whole_texture_copies_cover_every_mip() {
        let src = TextureDesc::texture_2d(Format::Rgba8Unorm, 64, 64, 4, 6);
        let dst = TextureDesc::texture_2d(Format::Rgba8Unorm, 64, 64, 3, 6);
        let copies = image_copies(&dst, None, &src, None);
        assert_eq!(copies.len(), 3);
        assert_eq!(copies[2].extent.width, 16);
        assert_eq!(copies[2].src_subresource.layer_count, 6);
    }

    #[test]
    fn pitches_become_texel_rows() {
        let desc = TextureDesc::texture_2d(Format::Rgba8Unorm, 100, 50, 1, 1);
        let layout = TextureDataLayoutDesc {
            offset: 512,
            row_pitch: 512,
            slice_pitch: 512 * 50,
        };
        let copy = buffer_image_copy(&desc, &TextureRegionDesc::default(), &layout);
        assert_eq!(copy.buffer_offset, 512);
        assert_eq!(copy.buffer_row_length, 128);
        assert_eq!(copy.buffer_image_height, 50);
        assert_eq!(copy.image_extent.width, 100);

        let bc = TextureDesc::texture_2d(Format::Bc1RgbaUnorm, 64, 64, 1, 1);
        let layout = TextureDataLayoutDesc {
            offset: 0,
            row_pitch: 16 * 8,
            slice_pitch: 16 * 8 * 16,
        };
        let copy = buffer_image_copy(&bc, &TextureRegionDesc::default(), &layout);
        assert_eq!(copy.buffer_row_length, 64);
        assert_eq!(copy.buffer_image_height, 64);
    }
}
