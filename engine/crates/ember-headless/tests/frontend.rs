use std::rc::Rc;

use ember_gfx::{
    api::{GraphicsApi, GraphicsApiExt},
    foundation::{Device, Instance},
    pipelines::{PipelineLayout, ShaderModule},
    handle::BufferHandle,
    options::*,
    raw_window_handle::{RawDisplayHandle, RawWindowHandle, XlibDisplayHandle, XlibWindowHandle},
    resources::Buffer,
    types::*,
    utilities::ResourceDeleter,
};
use ember_headless::HeadlessGraphicsApi;

fn setup_with_features(features: AdapterFeatures) -> (Rc<dyn GraphicsApi>, Instance, Device) {
    let api = HeadlessGraphicsApi::new_shared();
    let instance = api.create_instance(&InstanceOptions {
        application_name: "ember-headless-tests".to_string(),
        ..Default::default()
    });
    let device = instance
        .select_adapter(AdapterDeviceType::DiscreteGpu)
        .map(|adapter| {
            adapter.create_device(&DeviceOptions {
                requested_features: features,
                ..Default::default()
            })
        })
        .unwrap();
    assert!(device.is_valid());
    (api, instance, device)
}

fn setup() -> (Rc<dyn GraphicsApi>, Instance, Device) {
    setup_with_features(AdapterFeatures::default())
}

fn host_buffer(size: u64) -> BufferOptions {
    BufferOptions {
        label: Some("host buffer".to_string()),
        size,
        usage: BufferUsageFlags::TRANSFER_SRC | BufferUsageFlags::TRANSFER_DST,
        memory_usage: MemoryUsage::CpuToGpu,
    }
}

fn is_live(api: &Rc<dyn GraphicsApi>, buffer: BufferHandle) -> bool {
    api.resource_manager().borrow().contains(buffer)
}

#[test]
fn test_api_name() {
    let api = HeadlessGraphicsApi::new_shared();
    assert_eq!(api.api(), Api::Headless);
    assert_eq!(api.api_name(), "Headless");
}

#[test]
fn test_instance_adapters() {
    let (_api, instance, device) = setup();
    assert_eq!(instance.adapters().len(), 2);
    assert!(instance.select_adapter(AdapterDeviceType::Cpu).is_some());
    assert!(instance.select_adapter(AdapterDeviceType::VirtualGpu).is_none());

    let adapter = instance.select_adapter(AdapterDeviceType::DiscreteGpu).unwrap();
    assert_eq!(adapter.properties().device_name, "Ember Headless GPU");
    assert!(adapter.features().acceleration_structures);
    assert_eq!(adapter.queue_types().len(), 2);

    assert_eq!(device.queues().len(), 1);
    assert!(device.queues()[0].flags().contains(QueueFlags::GRAPHICS));
}

#[test]
fn test_buffer_lifetime() {
    let (api, _instance, device) = setup();
    let buffer = device.create_buffer(&host_buffer(64), None);
    let handle = buffer.handle();
    assert!(buffer.is_valid());
    assert!(is_live(&api, handle));
    assert_eq!(buffer.size(), 64);

    drop(buffer);
    assert!(!is_live(&api, handle));
}

#[test]
fn test_stale_handle_after_slot_reuse() {
    let (api, _instance, device) = setup();
    let first = device.create_buffer(&host_buffer(16), None);
    let stale = first.handle();
    drop(first);

    let second = device.create_buffer(&host_buffer(16), None);
    assert_eq!(second.handle().index(), stale.index());
    assert_ne!(second.handle().generation(), stale.generation());
    assert_ne!(second.handle(), stale);
    assert!(!is_live(&api, stale));
    assert!(is_live(&api, second.handle()));
}

#[test]
fn test_move_leaves_default_behind() {
    let (api, _instance, device) = setup();
    let mut buffer = device.create_buffer(&host_buffer(16), None);
    let handle = buffer.handle();

    let moved = std::mem::take(&mut buffer);
    assert!(!buffer.is_valid());
    assert!(moved.is_valid());
    assert_eq!(moved.handle(), handle);

    // 被移走的对象销毁时什么都不做
    drop(buffer);
    assert!(is_live(&api, handle));
    drop(moved);
    assert!(!is_live(&api, handle));
}

#[test]
fn test_assignment_releases_previous_resource() {
    let (api, _instance, device) = setup();
    let mut buffer = device.create_buffer(&host_buffer(16), None);
    let first = buffer.handle();
    assert!(is_live(&api, first));

    buffer = device.create_buffer(&host_buffer(32), None);
    assert!(!is_live(&api, first));
    assert!(buffer.is_valid());
    assert!(is_live(&api, buffer.handle()));
    assert_eq!(buffer.size(), 32);
}

#[test]
fn test_wrapper_equality() {
    let (_api, _instance, device) = setup();
    let a = device.create_buffer(&host_buffer(16), None);
    let b = device.create_buffer(&host_buffer(16), None);
    assert_ne!(a, b);
    assert_eq!(Buffer::default(), Buffer::default());
    assert_ne!(a, Buffer::default());
    assert_eq!(BufferHandle::from(&a), a.handle());
}

#[test]
fn test_same_handle_from_other_api_differs() {
    let (_api_a, _instance_a, device_a) = setup();
    let (_api_b, _instance_b, device_b) = setup();
    let a = device_a.create_buffer(&host_buffer(16), None);
    let b = device_b.create_buffer(&host_buffer(16), None);
    // 两个后端的第一个 buffer 句柄相同，但对象不相等
    assert_eq!(a.handle(), b.handle());
    assert_ne!(a, b);
}

#[test]
fn test_buffer_write_read() {
    let (_api, _instance, device) = setup();
    let buffer = device.create_buffer(&host_buffer(16), Some(&[9; 4]));
    assert_eq!(buffer.read(0, 4).unwrap(), vec![9, 9, 9, 9]);

    assert!(buffer.write_slice(4, &[0x0403_0201_u32]));
    assert_eq!(buffer.read(4, 4).unwrap(), vec![1, 2, 3, 4]);

    assert!(!buffer.write(14, &[0; 4]));
    assert!(buffer.read(12, 8).is_none());
}

#[test]
fn test_gpu_only_buffer_cannot_map() {
    let (_api, _instance, device) = setup();
    let buffer = device.create_buffer(
        &BufferOptions {
            memory_usage: MemoryUsage::GpuOnly,
            ..host_buffer(16)
        },
        None,
    );
    assert!(buffer.is_valid());
    assert!(buffer.map().is_none());
    assert!(!buffer.write(0, &[1]));
}

#[test]
fn test_zero_sized_buffer_is_invalid() {
    let (_api, _instance, device) = setup();
    let buffer = device.create_buffer(&host_buffer(0), None);
    assert!(!buffer.is_valid());
    assert_eq!(buffer.size(), 0);
    assert!(!buffer.write(0, &[1]));
}

#[test]
fn test_copy_through_queue() {
    let (_api, _instance, device) = setup();
    let src = device.create_buffer(&host_buffer(8), Some(&[1, 2, 3, 4, 5, 6, 7, 8]));
    let dst = device.create_buffer(&host_buffer(8), None);

    let recorder = device.create_command_recorder(&CommandRecorderOptions::default());
    recorder.copy_buffer(&BufferCopy {
        src: src.handle(),
        src_offset: 0,
        dst: dst.handle(),
        dst_offset: 2,
        byte_size: 4,
    });
    let command_buffer = recorder.finish();
    assert!(command_buffer.is_valid());
    assert!(!recorder.finish().is_valid());

    let fence = device.create_fence(&FenceOptions::default());
    let signal = device.create_gpu_semaphore(&GpuSemaphoreOptions::default());
    assert_eq!(fence.status(), FenceStatus::Unsignalled);

    device.queues()[0].submit(&SubmitOptions {
        command_buffers: vec![command_buffer.handle()],
        signal_semaphores: vec![signal.handle()],
        signal_fence: Some(fence.handle()),
        ..Default::default()
    });
    fence.wait();
    assert_eq!(fence.status(), FenceStatus::Signalled);
    assert_eq!(dst.read(0, 8).unwrap(), vec![0, 0, 1, 2, 3, 4, 0, 0]);

    fence.reset();
    assert_eq!(fence.status(), FenceStatus::Unsignalled);
}

#[test]
fn test_fence_created_signalled() {
    let (_api, _instance, device) = setup();
    let mut fence = device.create_fence(&FenceOptions {
        label: None,
        create_signalled: true,
    });
    assert_eq!(fence.status(), FenceStatus::Signalled);

    let moved = std::mem::take(&mut fence);
    assert_eq!(moved.status(), FenceStatus::Signalled);
    assert_eq!(fence.status(), FenceStatus::Error);
}

#[test]
fn test_bind_group_pool_reset_invalidates_bind_groups() {
    let (_api, _instance, device) = setup();
    let buffer = device.create_buffer(
        &BufferOptions {
            usage: BufferUsageFlags::UNIFORM,
            ..host_buffer(256)
        },
        None,
    );
    let layout = device.create_bind_group_layout(&BindGroupLayoutOptions {
        label: Some("camera".to_string()),
        bindings: vec![ResourceBindingLayout {
            binding: 0,
            count: 1,
            resource_type: ResourceBindingType::UniformBuffer,
            shader_stages: ShaderStageFlags::VERTEX | ShaderStageFlags::FRAGMENT,
        }],
    });
    let pool = device.create_bind_group_pool(&BindGroupPoolOptions::default());
    let bind_group = device.create_bind_group(&BindGroupOptions {
        label: None,
        layout: layout.handle(),
        resources: vec![BindGroupEntry {
            binding: 0,
            array_element: 0,
            resource: BindingResource::uniform_buffer(buffer.handle()),
        }],
        bind_group_pool: Some(pool.handle()),
    });
    assert!(bind_group.is_valid());
    assert_eq!(pool.allocated_bind_group_count(), 1);

    pool.reset();
    assert_eq!(pool.allocated_bind_group_count(), 0);
    assert!(!bind_group.is_valid());
    // 句柄本身仍然不是默认值，只是后端记录已经不在了
    assert!(bind_group.handle().is_valid());
}

#[test]
fn test_bind_group_rejects_mismatched_resource() {
    let (_api, _instance, device) = setup();
    let buffer = device.create_buffer(
        &BufferOptions {
            usage: BufferUsageFlags::STORAGE,
            ..host_buffer(64)
        },
        None,
    );
    let layout = device.create_bind_group_layout(&BindGroupLayoutOptions {
        label: None,
        bindings: vec![ResourceBindingLayout {
            binding: 0,
            count: 1,
            resource_type: ResourceBindingType::UniformBuffer,
            shader_stages: ShaderStageFlags::COMPUTE,
        }],
    });
    let bind_group = device.create_bind_group(&BindGroupOptions {
        layout: layout.handle(),
        resources: vec![BindGroupEntry {
            binding: 0,
            array_element: 0,
            resource: BindingResource::storage_buffer(buffer.handle()),
        }],
        ..Default::default()
    });
    assert!(!bind_group.is_valid());
}

#[test]
fn test_bind_group_from_default_pool() {
    let (_api, _instance, device) = setup();
    let layout = device.create_bind_group_layout(&BindGroupLayoutOptions::default());
    let bind_group = device.create_bind_group(&BindGroupOptions {
        layout: layout.handle(),
        ..Default::default()
    });
    assert!(bind_group.is_valid());
}

#[test]
fn test_pipelines() {
    let (_api, _instance, device) = setup();
    let invalid = device.create_shader_module(&[0x1234_5678]);
    assert!(!invalid.is_valid());

    let shader = device.create_shader_module(&[0x0723_0203, 0x0001_0000, 0, 1, 0]);
    assert!(shader.is_valid());

    let layout = device.create_pipeline_layout(&PipelineLayoutOptions::default());
    let compute = device.create_compute_pipeline(&ComputePipelineOptions {
        label: Some("cull".to_string()),
        layout: layout.handle(),
        shader_stage: ShaderStage::new(shader.handle(), ShaderStageFlags::COMPUTE),
    });
    assert!(compute.is_valid());

    let graphics = device.create_graphics_pipeline(&GraphicsPipelineOptions {
        shader_stages: vec![
            ShaderStage::new(shader.handle(), ShaderStageFlags::VERTEX),
            ShaderStage::new(shader.handle(), ShaderStageFlags::FRAGMENT),
        ],
        layout: layout.handle(),
        render_targets: vec![RenderTargetOptions::default()],
        ..Default::default()
    });
    assert!(graphics.is_valid());

    let broken = device.create_graphics_pipeline(&GraphicsPipelineOptions {
        shader_stages: vec![ShaderStage::new(invalid.handle(), ShaderStageFlags::VERTEX)],
        layout: layout.handle(),
        ..Default::default()
    });
    assert!(!broken.is_valid());
}

#[test]
fn test_texture_and_view() {
    let (_api, _instance, device) = setup();
    let texture = device.create_texture(&TextureOptions {
        extent: Extent3D {
            width: 256,
            height: 256,
            depth: 1,
        },
        usage: TextureUsageFlags::SAMPLED | TextureUsageFlags::TRANSFER_DST,
        ..Default::default()
    });
    assert!(texture.is_valid());

    let view = texture.create_view(&TextureViewOptions::default());
    assert!(view.is_valid());

    let sampler = device.create_sampler(&SamplerOptions::default());
    assert!(sampler.is_valid());
}

#[test]
fn test_swapchain_textures() {
    let (api, instance, device) = setup();
    let surface = instance.create_surface(&SurfaceOptions {
        display_handle: RawDisplayHandle::Xlib(XlibDisplayHandle::new(None, 0)),
        window_handle: RawWindowHandle::Xlib(XlibWindowHandle::new(1)),
    });
    assert!(surface.is_valid());

    let adapter = instance.select_adapter(AdapterDeviceType::DiscreteGpu).unwrap();
    assert!(adapter.supports_presentation(surface.handle(), 0));
    assert!(!adapter.supports_presentation(surface.handle(), 1));

    let swapchain = device.create_swapchain(&SwapchainOptions {
        surface: surface.handle(),
        extent: Extent2D {
            width: 800,
            height: 600,
        },
        ..Default::default()
    });
    assert!(swapchain.is_valid());
    assert_eq!(swapchain.textures().len(), 3);
    assert!(swapchain.textures().iter().all(|texture| texture.is_valid()));

    let image_available = device.create_gpu_semaphore(&GpuSemaphoreOptions::default());
    let AcquireImageResult::Success { image_index } = swapchain.acquire_next_image(Some(image_available.handle()), None)
    else {
        panic!("acquire failed");
    };
    assert_eq!(image_index, 0);

    let result = device.queues()[0].present(&PresentOptions {
        wait_semaphores: vec![image_available.handle()],
        swapchain_images: vec![SwapchainImageIndex {
            swapchain: swapchain.handle(),
            image_index,
        }],
    });
    assert_eq!(result, PresentResult::Success);

    let live_before = api.resource_manager().borrow().live_resources().len();
    drop(swapchain);
    let live_after = api.resource_manager().borrow().live_resources().len();
    assert_eq!(live_before - live_after, 4);
}

#[test]
fn test_device_destroy_releases_children() {
    let (api, _instance, device) = setup();
    let buffer = device.create_buffer(&host_buffer(16), None);
    let handle = buffer.handle();

    drop(device);
    assert!(!is_live(&api, handle));
    // 设备已经带走了它，这里的销毁是无操作
    drop(buffer);
}

#[test]
fn test_instance_destroy_releases_everything() {
    let (api, instance, device) = setup();
    let _buffer = device.create_buffer(&host_buffer(16), None);

    drop(instance);
    assert!(api.resource_manager().borrow().live_resources().is_empty());
}

#[test]
fn test_acceleration_structure_requires_feature() {
    let options = AccelerationStructureOptions {
        label: Some("blas".to_string()),
        ty: AccelerationStructureType::BottomLevel,
        size: 4096,
    };

    let (_api, _instance, device) = setup();
    assert!(!device.create_acceleration_structure(&options).is_valid());

    let (_api, _instance, device) = setup_with_features(AdapterFeatures {
        acceleration_structures: true,
        ..Default::default()
    });
    assert!(device.create_acceleration_structure(&options).is_valid());
}

#[test]
fn test_raytracing_pipeline_requires_feature() {
    fn raytracing_options(shader: &ShaderModule, layout: &PipelineLayout) -> RaytracingPipelineOptions {
        RaytracingPipelineOptions {
            label: Some("primary rays".to_string()),
            shader_stages: vec![
                ShaderStage::new(shader.handle(), ShaderStageFlags::RAYGEN),
                ShaderStage::new(shader.handle(), ShaderStageFlags::MISS),
                ShaderStage::new(shader.handle(), ShaderStageFlags::CLOSEST_HIT),
            ],
            shader_groups: vec![
                RaytracingShaderGroup::general(0),
                RaytracingShaderGroup::general(1),
                RaytracingShaderGroup::triangles_hit(Some(2), None),
            ],
            layout: layout.handle(),
            max_recursion_depth: 1,
        }
    }

    let (_api, _instance, device) = setup();
    let shader = device.create_shader_module(&[0x0723_0203]);
    let layout = device.create_pipeline_layout(&PipelineLayoutOptions::default());
    assert!(!device.create_raytracing_pipeline(&raytracing_options(&shader, &layout)).is_valid());

    let (api, _instance, device) = setup_with_features(AdapterFeatures {
        ray_tracing_pipeline: true,
        ..Default::default()
    });
    let shader = device.create_shader_module(&[0x0723_0203]);
    let layout = device.create_pipeline_layout(&PipelineLayoutOptions::default());
    let pipeline = device.create_raytracing_pipeline(&raytracing_options(&shader, &layout));
    assert!(pipeline.is_valid());
    assert_eq!(pipeline.shader_group_handles(0, 3).len() % 3, 0);
    assert!(!pipeline.shader_group_handles(0, 3).is_empty());
    assert!(pipeline.shader_group_handles(3, 1).is_empty());

    let handle = pipeline.handle();
    drop(pipeline);
    assert!(!api.resource_manager().borrow().contains(handle));
}

#[test]
fn test_timestamp_recording() {
    let (api, _instance, device) = setup();
    let recorder = device.create_command_recorder(&CommandRecorderOptions::default());
    let timestamps = recorder.begin_timestamp_recording(&TimestampQueryRecorderOptions::default());
    assert!(timestamps.is_valid());
    assert!(timestamps.timestamp_period() > 0.0);

    let begin = timestamps.write_timestamp(PipelineStageFlags::TOP_OF_PIPE).unwrap();
    let end = timestamps.write_timestamp(PipelineStageFlags::BOTTOM_OF_PIPE).unwrap();
    assert_eq!((begin, end), (0, 1));
    assert_eq!(timestamps.query_results().len(), 2);
    assert!(timestamps.ns_interval(begin, end) > 0);
    assert_eq!(timestamps.ns_interval(begin, 7), 0);

    let _command_buffer = recorder.finish();
    assert_eq!(timestamps.write_timestamp(PipelineStageFlags::TOP_OF_PIPE), None);
    assert_eq!(timestamps.query_results().len(), 2);

    timestamps.reset();
    assert!(timestamps.query_results().is_empty());

    let handle = timestamps.handle();
    drop(timestamps);
    assert!(!api.resource_manager().borrow().contains(handle));
}

#[test]
fn test_ycbcr_sampler() {
    let (_api, _instance, device) = setup_with_features(AdapterFeatures {
        sampler_ycbcr_conversion: true,
        ..Default::default()
    });
    let conversion = device.create_ycbcr_conversion(&YcbcrConversionOptions::default());
    assert!(conversion.is_valid());

    let sampler = device.create_sampler(&SamplerOptions {
        ycbcr_conversion: Some(conversion.handle()),
        ..Default::default()
    });
    assert!(sampler.is_valid());
}

#[test]
fn test_resource_deleter_defers_destruction() {
    let (api, _instance, device) = setup();
    let mut deleter = ResourceDeleter::new(2);

    let buffer = device.create_buffer(&host_buffer(16), None);
    let handle = buffer.handle();
    deleter.delete_later(buffer);

    deleter.move_to_next_frame();
    deleter.deref_frame_index(0);
    assert!(is_live(&api, handle));

    deleter.deref_frame_index(1);
    assert!(!is_live(&api, handle));
    assert!(deleter.frame_bins().is_empty());
}
