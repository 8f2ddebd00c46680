//! `Backend` implementation on top of wgpu.
//!
//! Frame flow:
//! - the host hands over an acquired [`GpuFrame`] with [`WgpuBackend::begin_frame`]
//! - `clear` opens the frame's render pass; `draw` records into it
//! - [`WgpuBackend::end_frame`] closes the pass and returns the frame for submission
//!
//! Uniform blocks are written into one ring buffer per frame and bound with
//! dynamic offsets, so every draw sees its own values.

use std::sync::{Arc, Mutex};

use wgpu::util::DeviceExt;

use crate::device::GpuFrame;
use crate::geometry::VertexArray;
use crate::paint::Color;
use crate::shader::{self, LinkError, LinkedProgram};
use crate::texture::{Filter, TextureImage};

use super::{Backend, BackendInfo, Draw};

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Bytes visible through the uniform binding; larger blocks are rejected.
const UNIFORM_WINDOW: u64 = 512;

const INITIAL_UNIFORM_CAPACITY: u64 = 64 * 1024;

pub struct WgpuProgram {
    label: String,
    pipeline: wgpu::RenderPipeline,
    vertex_buffers: usize,
    textured: bool,
}

pub struct WgpuBuffer {
    buffer: wgpu::Buffer,
}

pub struct WgpuTexture {
    _texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
}

struct DepthTarget {
    view: wgpu::TextureView,
    width: u32,
    height: u32,
}

struct ActiveFrame {
    frame: GpuFrame,
    pass: Option<wgpu::RenderPass<'static>>,
    width: u32,
    height: u32,
}

/// Growable uniform buffer bound with a dynamic offset per draw.
struct UniformRing {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    capacity: u64,
    cursor: u64,
    align: u64,
}

impl UniformRing {
    fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, capacity: u64) -> Self {
        let align = device.limits().min_uniform_buffer_offset_alignment.max(1) as u64;
        let (buffer, bind_group) = Self::allocate(device, layout, capacity);
        Self {
            buffer,
            bind_group,
            capacity,
            cursor: 0,
            align,
        }
    }

    fn allocate(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        capacity: u64,
    ) -> (wgpu::Buffer, wgpu::BindGroup) {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("tumble uniform ring"),
            size: capacity,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("tumble uniform bind group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: shader::UNIFORM_BINDING,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(UNIFORM_WINDOW),
                }),
            }],
        });

        (buffer, bind_group)
    }

    fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Writes `data` at the next aligned offset and returns that offset.
    fn push(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        data: &[u8],
    ) -> u32 {
        let stride = (data.len() as u64).max(1).div_ceil(self.align) * self.align;

        if self.cursor + stride.max(UNIFORM_WINDOW) > self.capacity {
            // Draws already recorded keep the old buffer alive through the pass.
            let capacity = (self.capacity * 2).max(stride + UNIFORM_WINDOW);
            let (buffer, bind_group) = Self::allocate(device, layout, capacity);
            log::debug!("uniform ring grown to {capacity} bytes");
            self.buffer = buffer;
            self.bind_group = bind_group;
            self.capacity = capacity;
            self.cursor = 0;
        }

        let offset = self.cursor;
        if !data.is_empty() {
            queue.write_buffer(&self.buffer, offset, data);
        }
        self.cursor += stride;
        offset as u32
    }
}

/// wgpu implementation of [`Backend`].
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    adapter_info: wgpu::AdapterInfo,
    color_format: wgpu::TextureFormat,

    uniform_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    uniforms: UniformRing,

    depth: Option<DepthTarget>,
    viewport: (u32, u32),
    frame: Option<ActiveFrame>,

    errors: Arc<Mutex<Vec<String>>>,
    warned_no_frame: bool,
}

impl WgpuBackend {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        adapter_info: wgpu::AdapterInfo,
        color_format: wgpu::TextureFormat,
    ) -> Self {
        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&errors);
        device.on_uncaptured_error(Arc::new(move |e: wgpu::Error| {
            if let Ok(mut errors) = sink.lock() {
                errors.push(e.to_string());
            }
        }));

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("tumble uniform bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: shader::UNIFORM_BINDING,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("tumble texture bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: shader::TEXTURE_BINDING,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: shader::SAMPLER_BINDING,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let uniforms = UniformRing::new(device, &uniform_layout, INITIAL_UNIFORM_CAPACITY);

        Self {
            device: device.clone(),
            queue: queue.clone(),
            adapter_info,
            color_format,
            uniform_layout,
            texture_layout,
            uniforms,
            depth: None,
            viewport: (1, 1),
            frame: None,
            errors,
            warned_no_frame: false,
        }
    }

    /// Starts recording into `frame`. A frame left open is discarded.
    pub fn begin_frame(&mut self, frame: GpuFrame) {
        if self.frame.is_some() {
            log::warn!("begin_frame while a frame is open; previous frame dropped");
            self.end_frame();
        }

        let size = frame.surface_texture.texture.size();
        self.ensure_depth(size.width, size.height);
        self.uniforms.reset();
        self.frame = Some(ActiveFrame {
            frame,
            pass: None,
            width: size.width,
            height: size.height,
        });
    }

    /// Closes the render pass and hands the frame back for submission.
    ///
    /// GPU errors nobody checked during the frame are logged here.
    pub fn end_frame(&mut self) -> Option<GpuFrame> {
        let mut active = self.frame.take()?;
        drop(active.pass.take());
        if let Some(err) = self.check_error("frame") {
            log::error!("GPU error during frame: {err}");
        }
        Some(active.frame)
    }

    fn ensure_depth(&mut self, width: u32, height: u32) {
        let width = width.max(1);
        let height = height.max(1);
        if let Some(depth) = &self.depth
            && depth.width == width
            && depth.height == height
        {
            return;
        }

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("tumble depth"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        self.depth = Some(DepthTarget {
            view,
            width,
            height,
        });
    }

    fn texture_sampler(&self, image: &TextureImage) -> wgpu::Sampler {
        let (filter, mipmap_filter) = match image.filter {
            Filter::Nearest => (wgpu::FilterMode::Nearest, wgpu::MipmapFilterMode::Nearest),
            Filter::Linear => (wgpu::FilterMode::Linear, wgpu::MipmapFilterMode::Linear),
        };

        self.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(image.label),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            mag_filter: filter,
            min_filter: filter,
            mipmap_filter,
            ..Default::default()
        })
    }
}

/// Opens a pass on the frame's color target and the shared depth buffer.
/// `clear` selects between clearing both attachments and loading them.
fn open_pass(
    active: &mut ActiveFrame,
    depth: &wgpu::TextureView,
    clear: Option<Color>,
    viewport: (u32, u32),
) -> wgpu::RenderPass<'static> {
    let (color_load, depth_load) = match clear {
        Some(c) => (wgpu::LoadOp::Clear(c.into()), wgpu::LoadOp::Clear(1.0)),
        None => (wgpu::LoadOp::Load, wgpu::LoadOp::Load),
    };

    let mut pass = active
        .frame
        .encoder
        .begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("tumble scene pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &active.frame.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: color_load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth,
                depth_ops: Some(wgpu::Operations {
                    load: depth_load,
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        })
        .forget_lifetime();

    apply_viewport(&mut pass, viewport, (active.width, active.height));
    pass
}

/// The viewport never exceeds the attachment.
fn apply_viewport(pass: &mut wgpu::RenderPass<'_>, viewport: (u32, u32), target: (u32, u32)) {
    let w = viewport.0.clamp(1, target.0.max(1));
    let h = viewport.1.clamp(1, target.1.max(1));
    pass.set_viewport(0.0, 0.0, w as f32, h as f32, 0.0, 1.0);
}

fn vertex_format(components: u32) -> Option<wgpu::VertexFormat> {
    match components {
        1 => Some(wgpu::VertexFormat::Float32),
        2 => Some(wgpu::VertexFormat::Float32x2),
        3 => Some(wgpu::VertexFormat::Float32x3),
        4 => Some(wgpu::VertexFormat::Float32x4),
        _ => None,
    }
}

impl Backend for WgpuBackend {
    type Program = WgpuProgram;
    type Buffer = WgpuBuffer;
    type Texture = WgpuTexture;

    fn info(&self) -> BackendInfo {
        let info = &self.adapter_info;
        BackendInfo {
            version: format!("{:?} {} {}", info.backend, info.driver, info.driver_info),
            vendor: format!("{:#06x}", info.vendor),
            renderer: format!("{} ({:?})", info.name, info.device_type),
            extensions: format!("{:?}", self.device.features()),
        }
    }

    fn create_program(&mut self, program: &LinkedProgram) -> Result<Self::Program, LinkError> {
        let label = program.label();

        if let Some(block) = program.uniform_block()
            && block.size as u64 > UNIFORM_WINDOW
        {
            return Err(LinkError::Pipeline(format!(
                "uniform block is {} bytes, at most {UNIFORM_WINDOW} are supported",
                block.size
            )));
        }

        let mut attributes = Vec::with_capacity(program.attributes().len());
        for a in program.attributes() {
            let format = vertex_format(a.components).ok_or_else(|| {
                LinkError::UnsupportedAttribute {
                    name: a.name.clone(),
                }
            })?;
            attributes.push([wgpu::VertexAttribute {
                format,
                offset: 0,
                shader_location: a.location,
            }]);
        }
        let buffers: Vec<wgpu::VertexBufferLayout<'_>> = attributes
            .iter()
            .map(|attr| wgpu::VertexBufferLayout {
                array_stride: attr[0].format.size(),
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: attr,
            })
            .collect();

        let vertex = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(program.vertex().source().into()),
        });
        let fragment = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(program.fragment().source().into()),
        });

        let textured = program.has_texture();
        let bind_group_layouts: Vec<&wgpu::BindGroupLayout> = if textured {
            vec![&self.uniform_layout, &self.texture_layout]
        } else {
            vec![&self.uniform_layout]
        };

        let layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(label),
                bind_group_layouts: &bind_group_layouts,
                immediate_size: 0,
            });

        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&layout),

                vertex: wgpu::VertexState {
                    module: &vertex,
                    entry_point: Some(program.vertex().entry_point()),
                    compilation_options: Default::default(),
                    buffers: &buffers,
                },

                fragment: Some(wgpu::FragmentState {
                    module: &fragment,
                    entry_point: Some(program.fragment().entry_point()),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: self.color_format,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),

                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: Some(wgpu::Face::Back),
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },

                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),

                multiview_mask: None,
                cache: None,
            });

        if let Some(err) = self.check_error(label) {
            return Err(LinkError::Pipeline(err));
        }

        Ok(WgpuProgram {
            label: label.to_string(),
            pipeline,
            vertex_buffers: attributes.len(),
            textured,
        })
    }

    fn upload(&mut self, label: &str, array: VertexArray<'_>) -> Self::Buffer {
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(array.data),
                usage: wgpu::BufferUsages::VERTEX,
            });
        WgpuBuffer { buffer }
    }

    fn create_texture(&mut self, image: &TextureImage) -> Self::Texture {
        let levels = image.mip_chain();

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(image.label),
            size: wgpu::Extent3d {
                width: image.width,
                height: image.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: levels.len() as u32,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (mip, level) in levels.iter().enumerate() {
            self.queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: mip as u32,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                &level.rgba,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(level.width * 4),
                    rows_per_image: Some(level.height),
                },
                wgpu::Extent3d {
                    width: level.width,
                    height: level.height,
                    depth_or_array_layers: 1,
                },
            );
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = self.texture_sampler(image);

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(image.label),
            layout: &self.texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: shader::TEXTURE_BINDING,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: shader::SAMPLER_BINDING,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        log::debug!(
            "texture `{}` uploaded: {}x{}, {} level(s)",
            image.label,
            image.width,
            image.height,
            levels.len()
        );

        WgpuTexture {
            _texture: texture,
            bind_group,
        }
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = (width.max(1), height.max(1));
        if let Some(active) = self.frame.as_mut() {
            let target = (active.width, active.height);
            if let Some(pass) = active.pass.as_mut() {
                apply_viewport(pass, self.viewport, target);
            }
        }
    }

    fn clear(&mut self, color: Color) {
        let (Some(active), Some(depth)) = (self.frame.as_mut(), self.depth.as_ref()) else {
            if !self.warned_no_frame {
                log::warn!("clear outside of a frame ignored");
                self.warned_no_frame = true;
            }
            return;
        };

        drop(active.pass.take());
        let pass = open_pass(active, &depth.view, Some(color), self.viewport);
        active.pass = Some(pass);
    }

    fn draw(&mut self, draw: &Draw<'_, Self>) {
        let program = draw.program;
        if draw.attributes.len() != program.vertex_buffers {
            log::error!(
                "program `{}` reads {} arrays, draw supplied {}",
                program.label,
                program.vertex_buffers,
                draw.attributes.len()
            );
            return;
        }
        if program.textured && draw.texture.is_none() {
            log::error!("program `{}` drawn without a texture", program.label);
            return;
        }

        let (Some(active), Some(depth)) = (self.frame.as_mut(), self.depth.as_ref()) else {
            if !self.warned_no_frame {
                log::warn!("draw outside of a frame ignored");
                self.warned_no_frame = true;
            }
            return;
        };

        let offset = self.uniforms.push(
            &self.device,
            &self.queue,
            &self.uniform_layout,
            draw.uniforms.as_bytes(),
        );

        if active.pass.is_none() {
            let pass = open_pass(active, &depth.view, None, self.viewport);
            active.pass = Some(pass);
        }
        let Some(pass) = active.pass.as_mut() else { return };

        pass.set_pipeline(&program.pipeline);
        pass.set_bind_group(shader::UNIFORM_GROUP, &self.uniforms.bind_group, &[offset]);
        if let Some((slot, texture)) = draw.texture {
            pass.set_bind_group(slot.group, &texture.bind_group, &[]);
        }
        for (slot, attribute) in draw.attributes.iter().enumerate() {
            pass.set_vertex_buffer(slot as u32, attribute.buffer.buffer.slice(..));
        }
        pass.draw(0..draw.vertex_count, 0..1);
    }

    fn check_error(&mut self, _op: &str) -> Option<String> {
        let mut errors = self.errors.lock().ok()?;
        if errors.is_empty() {
            return None;
        }
        Some(errors.drain(..).collect::<Vec<_>>().join("; "))
    }
}
